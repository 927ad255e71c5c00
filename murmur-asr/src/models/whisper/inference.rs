//! ONNX inference for the Whisper encoder, cross-attention initializer and
//! decoder.

use super::core::{CacheOutputs, WhisperModel};
use crate::cache::{CacheGeometry, KvCache, KvTensor};
use crate::error::{ModelError, Result};
use crate::token::TokenId;
use crate::traits::{DecoderModel, DecoderStep, Encoder, EncoderOutput};
use ndarray::{Array2, Array3, Ix3, Ix4};
use ort::session::SessionInputValue;
use ort::value::{DynValue, Tensor, TensorRef};
use std::borrow::Cow;

fn required(value: Option<DynValue>, name: &str) -> Result<DynValue> {
    value.ok_or_else(|| {
        ModelError::MissingOutput {
            name: name.to_string(),
        }
        .into()
    })
}

fn to_kv(value: Option<DynValue>, name: &str) -> Result<KvTensor> {
    let tensor = required(value, name)?
        .try_extract_array::<f32>()?
        .to_owned()
        .into_dimensionality::<Ix4>()?;

    Ok(tensor)
}

impl Encoder for WhisperModel {
    type Features = Array3<f32>;

    fn encode(&mut self, features: Self::Features) -> Result<EncoderOutput> {
        let input = Tensor::from_array(features)?;
        let input_name = self.encoder_signature.inputs[0].as_str();
        let output_name = self.encoder_signature.outputs[0].as_str();

        let mut outputs = self.encoder.run(vec![(
            Cow::Borrowed(input_name),
            SessionInputValue::from(input),
        )])?;

        let encoder_output = required(outputs.remove(output_name), output_name)?
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix3>()?;

        tracing::debug!(shape = ?encoder_output.shape(), "encoded audio");

        Ok(encoder_output)
    }
}

impl DecoderModel for WhisperModel {
    fn geometry(&self) -> CacheGeometry {
        self.geometry
    }

    fn cross_attention(&mut self, encoder_output: &EncoderOutput) -> Result<Vec<KvTensor>> {
        let input = TensorRef::from_array_view(encoder_output.view())?;
        let input_name = self.cross_attention_signature.inputs[0].as_str();

        let mut outputs = self.cross_attention_init.run(vec![(
            Cow::Borrowed(input_name),
            SessionInputValue::from(input),
        )])?;

        self.cross_attention_signature
            .outputs
            .iter()
            .map(|name| to_kv(outputs.remove(name), name))
            .collect()
    }

    fn step(
        &mut self,
        token: TokenId,
        encoder_output: &EncoderOutput,
        cache: &KvCache,
    ) -> Result<DecoderStep> {
        let token = Tensor::from_array(Array2::from_elem((1, 1), token as i64))?;

        let mut values: Vec<SessionInputValue<'_>> =
            Vec::with_capacity(2 + cache.geometry().bundle_len());
        values.push(token.into());
        values.push(TensorRef::from_array_view(encoder_output.view())?.into());
        for tensor in cache.bundle() {
            values.push(TensorRef::from_array_view(tensor)?.into());
        }

        let inputs: Vec<_> = self
            .decoder_signature
            .inputs
            .iter()
            .map(|name| Cow::Borrowed(name.as_str()))
            .zip(values)
            .collect();

        let mut outputs = self.decoder.run(inputs)?;

        let (logits_name, cache_names) = self
            .decoder_signature
            .outputs
            .split_first()
            .ok_or(ModelError::EmptyLogits)?;

        let logits = required(outputs.remove(logits_name), logits_name)?
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix3>()?;

        let self_attention = match self.cache_outputs {
            CacheOutputs::SelfOnly => cache_names
                .iter()
                .map(|name| to_kv(outputs.remove(name), name))
                .collect::<Result<Vec<_>>>()?,
            CacheOutputs::Full => cache_names
                .chunks(4)
                .flat_map(|layer| &layer[..2])
                .map(|name| to_kv(outputs.remove(name), name))
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(DecoderStep {
            logits,
            self_attention,
        })
    }
}
