//! Instructions sent to the vision model.
//!
//! Keeping the prompt here lets tests inspect it without a live model, and
//! keeps the gateway code free of prompt text.

/// Instruction sent alongside every receipt image.
///
/// The reply is parsed with a strict JSON parser, so the prompt insists on a
/// bare JSON object with a fixed shape.
pub const RECEIPT_EXTRACTION_PROMPT: &str = "Parse this bill/receipt and extract all items with their names, prices, and quantities. Also identify the tax amount if shown. Return the response in this exact JSON format: {\"items\": [{\"name\": \"item name\", \"price\": 12.99, \"quantity\": 1}], \"tax\": 2.50}. Only return the JSON, no other text.";
