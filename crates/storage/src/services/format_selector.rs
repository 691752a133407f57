use crate::error::{Result, StorageError};
use crate::models::BracketFormat;

/// Picks the competition format for `count` participants.
///
/// An explicit override always wins. Without one: a single participant is a
/// champion without matches (`None`), two fight a best-of-3, three to five a
/// round robin, six or more an elimination with repechage.
pub fn select_format(
    count: usize,
    override_format: Option<BracketFormat>,
) -> Result<Option<BracketFormat>> {
    if count < 1 {
        return Err(StorageError::validation(
            "at least one participant is required to select a format",
        ));
    }

    if let Some(format) = override_format {
        return Ok(Some(format));
    }

    let format = match count {
        1 => None,
        2 => Some(BracketFormat::BestOfThree),
        3..=5 => Some(BracketFormat::RoundRobin),
        _ => Some(BracketFormat::EliminationWithRepechage),
    };

    Ok(format)
}
