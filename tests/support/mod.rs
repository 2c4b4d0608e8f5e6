use abnf::{CaptureResult, Value};

pub fn bytes(text: &str) -> Value {
    Value::Bytes(text.as_bytes().to_vec())
}

pub fn chars(text: &str) -> Vec<Value> {
    text.bytes().map(|byte| Value::Bytes(vec![byte])).collect()
}

pub fn tokens(parts: &[&str]) -> Vec<Vec<u8>> {
    parts.iter().map(|part| part.as_bytes().to_vec()).collect()
}

pub fn assert_partition<S>(result: &CaptureResult<S>) {
    let mut whole = result.string_text.clone();
    whole.extend_from_slice(&result.rest);
    assert_eq!(whole, result.input);
}
