use crate::prediction::aggregation_window::WinningPrediction;

pub const FIELD_DELIMITER: char = '#';
pub const FRAME_TERMINATOR: char = '\n';

/// `<class_name>#<confidence_percent>\n` as UTF-8. The peripheral splits
/// on the newline; nothing is escaped.
pub fn encode(prediction: &WinningPrediction) -> Vec<u8> {
    format!(
        "{}{}{}{}",
        prediction.class_name, FIELD_DELIMITER, prediction.confidence_percent, FRAME_TERMINATOR
    )
    .into_bytes()
}
