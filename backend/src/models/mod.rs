pub mod academic_year;
pub mod macros;
pub mod schedule;
pub mod upload;
pub mod weightage;

pub use academic_year::AcademicYear;
pub use schedule::*;
pub use upload::{UploadBundle, UploadFile, UploadSlot};
pub use weightage::WeightageConfig;
