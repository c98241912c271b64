//! Concrete [`MaskedLanguageModel`] backed by an ONNX Runtime session, in the
//! teacher's direct `ort` style (see `ORTLayoutParser`). The session is
//! caller-supplied; no model weights are bundled with this crate.

use std::path::Path;

use ndarray::Array3;
use ort::session::Session;

use super::MaskedLanguageModel;

pub struct OrtMaskedLm {
    session: Session,
}

impl OrtMaskedLm {
    pub fn load(model_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let session = Session::builder()?.commit_from_file(model_path)?;
        Ok(Self { session })
    }
}

impl MaskedLanguageModel for OrtMaskedLm {
    fn infer(
        &self,
        input_ids: &[u32],
        attention_mask: &[u32],
        token_type_ids: &[u32],
    ) -> anyhow::Result<Array3<f32>> {
        let seq_len = input_ids.len();
        let ids: Vec<i64> = input_ids.iter().map(|&v| v as i64).collect();
        let mask: Vec<i64> = attention_mask.iter().map(|&v| v as i64).collect();
        let types: Vec<i64> = token_type_ids.iter().map(|&v| v as i64).collect();

        let input_ids_arr = ndarray::Array2::from_shape_vec((1, seq_len), ids)?;
        let attention_mask_arr = ndarray::Array2::from_shape_vec((1, seq_len), mask)?;
        let token_type_ids_arr = ndarray::Array2::from_shape_vec((1, seq_len), types)?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => input_ids_arr,
            "attention_mask" => attention_mask_arr,
            "token_type_ids" => token_type_ids_arr,
        ]?)?;

        let logits = outputs[0].try_extract_tensor::<f32>()?;
        let shape = logits.shape();
        let vocab_size = shape[2];
        let flat: Vec<f32> = logits.iter().copied().collect();
        let arr = Array3::from_shape_vec((1, seq_len, vocab_size), flat)?;
        Ok(arr)
    }
}
