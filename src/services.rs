pub mod register_cleaning_service;

pub use register_cleaning_service::{
    CleanedRegister, CleaningError, RawRegisterDocument, RegisterCleaningService,
};
