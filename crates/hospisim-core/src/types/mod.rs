pub mod daily;
pub mod patient;
pub mod resource;

pub use daily::{BedOccupancy, DailyRecord, EquipmentCount, ExamCounts, ModalityCount, StaffPresence};
pub use patient::{AdmissionType, ArrivalMode, PatientRecord, Sex};
pub use resource::ResourceRecord;
