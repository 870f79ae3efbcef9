use magswipe_core::{Decoder, Encoder, EncoderConfig};
use wasm_bindgen::prelude::*;

fn to_js(err: magswipe_core::DecodeError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WasmEncoder {
    inner: Encoder,
}

#[wasm_bindgen]
impl WasmEncoder {
    #[wasm_bindgen(constructor)]
    pub fn new(samples_per_bit: usize) -> Result<WasmEncoder, JsValue> {
        Encoder::with_config(EncoderConfig {
            samples_per_bit,
            ..EncoderConfig::default()
        })
        .map(|encoder| WasmEncoder { inner: encoder })
        .map_err(to_js)
    }

    /// Synthesise a swipe of the given track data
    /// Returns an Int16Array of 44.1 kHz mono samples
    #[wasm_bindgen]
    pub fn encode(&self, data: &str) -> Result<Vec<i16>, JsValue> {
        self.inner.encode(data).map_err(to_js)
    }
}

#[wasm_bindgen]
pub struct WasmDecoder {
    inner: Decoder,
}

#[wasm_bindgen]
impl WasmDecoder {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmDecoder {
        WasmDecoder {
            inner: Decoder::new(),
        }
    }

    /// Decode one swipe from an Int16Array of 44.1 kHz mono samples
    #[wasm_bindgen]
    pub fn decode(&self, samples: &[i16]) -> Result<String, JsValue> {
        self.inner.decode(samples).map_err(to_js)
    }

    /// Decode one swipe from Web Audio float samples in [-1, 1]
    #[wasm_bindgen(js_name = decodeFloat)]
    pub fn decode_float(&self, samples: &[f32]) -> Result<String, JsValue> {
        let pcm: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();
        self.decode(&pcm)
    }
}

impl Default for WasmDecoder {
    fn default() -> Self {
        Self::new()
    }
}
