pub mod bracket;
pub mod matches;
pub mod official_result;

pub use bracket::BracketRepository;
pub use matches::MatchRepository;
pub use official_result::OfficialResultRepository;
