//! JavaScript bindings for the pure parts of the crate.

use js_sys::Array;
use wasm_bindgen::prelude::*;

use crate::pattern::{expand, pieces_contains};
use crate::piece::Queue;
use crate::query::WantedSave;

/// Every queue of `pattern`, as strings.
#[wasm_bindgen(js_name = extendPieces)]
pub fn extend_pieces(pattern: &str) -> Result<Array, JsError> {
    let queues = expand(pattern)?;
    Ok(queues.iter().map(|queue| JsValue::from_str(&queue.to_string())).collect())
}

/// Position of `queue` in the expansion of `pattern`, or -1.
#[wasm_bindgen(js_name = piecesContains)]
pub fn pieces_contains_js(queue: &str, pattern: &str) -> Result<i32, JsError> {
    Ok(pieces_contains(queue, pattern)?.map_or(-1, |index| index as i32))
}

/// Whether `expression` accepts a row with the given save alternatives.
#[wasm_bindgen(js_name = wantedSavesMatch)]
pub fn wanted_saves_match(expression: &str, saves: Vec<String>) -> Result<bool, JsError> {
    let query = WantedSave::parse(expression)?;
    let saves = saves.iter().map(|save| save.parse::<Queue>()).collect::<Result<Vec<_>, _>>()?;
    Ok(query.matches(&saves))
}
