pub mod events;

pub use events::MediaEvent;
