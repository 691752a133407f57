pub mod bracket;
pub mod matches;

pub use bracket::{EntryGroup, GenerateBracketsRequest, Registrant};
pub use matches::{RecordResultRequest, VoidMatchRequest};
