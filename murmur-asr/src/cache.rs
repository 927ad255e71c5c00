//! Key/value cache for the autoregressive decoder.
//!
//! Every decoder layer owns four tensors of shape `(1, heads, len, head_dim)`:
//! self-attention key and value, cross-attention key and value. The
//! cross-attention pair is computed once from the encoder output and never
//! changes. The self-attention pair starts at length 0 and is replaced
//! wholesale after every step by the decoder's output, one position longer.
//!
//! Nothing is evicted. Growth is bounded only by the decoding step limit.

use crate::error::{ModelError, Result};
use crate::traits::{DecoderModel, EncoderOutput};
use ndarray::{Array4, ArrayView4, Axis};

/// Cache tensor, `(batch, heads, len, head_dim)`.
pub type KvTensor = Array4<f32>;

/// Decoder dimensions that determine cache shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheGeometry {
    pub layers: usize,
    pub heads: usize,
    pub head_dim: usize,
}

impl CacheGeometry {
    /// Whisper large-v3: 32 decoder layers, 20 heads of 64 dims.
    pub const WHISPER_LARGE_V3: Self = Self {
        layers: 32,
        heads: 20,
        head_dim: 64,
    };

    /// Tensors per layer in the flattened bundle.
    pub const TENSORS_PER_LAYER: usize = 4;

    pub fn bundle_len(&self) -> usize {
        self.layers * Self::TENSORS_PER_LAYER
    }

    fn check(&self, layer: usize, tensor: &KvTensor) -> std::result::Result<(), ModelError> {
        let shape = tensor.shape();
        if shape[0] != 1 || shape[1] != self.heads || shape[3] != self.head_dim {
            return Err(ModelError::CacheShape {
                layer,
                got: shape.to_vec(),
                heads: self.heads,
                head_dim: self.head_dim,
            });
        }
        Ok(())
    }
}

/// Key and value of one attention layer.
#[derive(Clone, Debug, PartialEq)]
pub struct KvPair {
    pub key: KvTensor,
    pub value: KvTensor,
}

impl KvPair {
    fn seq_len(&self) -> usize {
        self.key.len_of(Axis(2))
    }
}

fn pair_up(
    tensors: Vec<KvTensor>,
    geometry: CacheGeometry,
) -> std::result::Result<Vec<KvPair>, ModelError> {
    let expected = geometry.layers * 2;
    if tensors.len() != expected {
        return Err(ModelError::CacheArity {
            expected,
            got: tensors.len(),
        });
    }

    let mut layers = Vec::with_capacity(geometry.layers);
    let mut tensors = tensors.into_iter();

    while let (Some(key), Some(value)) = (tensors.next(), tensors.next()) {
        let layer = layers.len();
        geometry.check(layer, &key)?;
        geometry.check(layer, &value)?;
        layers.push(KvPair { key, value });
    }

    Ok(layers)
}

/// Cross-attention cache, read-only after initialization.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossAttentionCache {
    layers: Vec<KvPair>,
}

impl CrossAttentionCache {
    /// Pair up `[k0, v0, k1, v1, ...]` as produced by the initializer.
    pub fn from_tensors(tensors: Vec<KvTensor>, geometry: CacheGeometry) -> Result<Self> {
        Ok(Self {
            layers: pair_up(tensors, geometry)?,
        })
    }

    pub fn layers(&self) -> &[KvPair] {
        &self.layers
    }
}

/// Self-attention cache, replaced after every decode step.
#[derive(Clone, Debug, PartialEq)]
pub struct SelfAttentionCache {
    layers: Vec<KvPair>,
}

impl SelfAttentionCache {
    /// Zero-length key/value tensors for every layer.
    pub fn seed(geometry: CacheGeometry) -> Self {
        let empty = KvTensor::zeros((1, geometry.heads, 0, geometry.head_dim));
        let layers = (0..geometry.layers)
            .map(|_| KvPair {
                key: empty.clone(),
                value: empty.clone(),
            })
            .collect();

        Self { layers }
    }

    /// Pair up `[k0, v0, k1, v1, ...]` as returned by a decode step.
    pub fn from_tensors(tensors: Vec<KvTensor>, geometry: CacheGeometry) -> Result<Self> {
        Ok(Self {
            layers: pair_up(tensors, geometry)?,
        })
    }

    pub fn layers(&self) -> &[KvPair] {
        &self.layers
    }

    /// Cached sequence length, taken from the first layer.
    pub fn seq_len(&self) -> usize {
        self.layers.first().map_or(0, KvPair::seq_len)
    }
}

/// Cache state threaded through the decoding loop.
///
/// [`KvCache::advance`] consumes the cache and returns its successor, so a
/// step's input cache cannot outlive the step.
#[derive(Debug)]
pub struct KvCache {
    geometry: CacheGeometry,
    cross_attention: CrossAttentionCache,
    self_attention: SelfAttentionCache,
}

impl KvCache {
    /// Run the cross-attention initializer once and seed an empty
    /// self-attention cache.
    pub fn initialize<M>(model: &mut M, encoder_output: &EncoderOutput) -> Result<Self>
    where
        M: DecoderModel + ?Sized,
    {
        let geometry = model.geometry();
        let tensors = model.cross_attention(encoder_output)?;
        let cross_attention = CrossAttentionCache::from_tensors(tensors, geometry)?;

        tracing::debug!(layers = geometry.layers, "initialized cross-attention cache");

        Ok(Self::new(geometry, cross_attention))
    }

    pub fn new(geometry: CacheGeometry, cross_attention: CrossAttentionCache) -> Self {
        Self {
            geometry,
            cross_attention,
            self_attention: SelfAttentionCache::seed(geometry),
        }
    }

    pub fn geometry(&self) -> CacheGeometry {
        self.geometry
    }

    pub fn cross_attention(&self) -> &CrossAttentionCache {
        &self.cross_attention
    }

    pub fn self_attention(&self) -> &SelfAttentionCache {
        &self.self_attention
    }

    /// Number of positions held by the self-attention cache.
    pub fn seq_len(&self) -> usize {
        self.self_attention.seq_len()
    }

    /// Flatten to `[self_k, self_v, cross_k, cross_v]` per layer.
    pub fn bundle(&self) -> Vec<ArrayView4<'_, f32>> {
        self.self_attention
            .layers
            .iter()
            .zip(&self.cross_attention.layers)
            .flat_map(|(s, c)| [s.key.view(), s.value.view(), c.key.view(), c.value.view()])
            .collect()
    }

    /// Replace the self-attention cache with a step's output.
    ///
    /// Every layer of `next` must be exactly one position longer than the
    /// current cache. Cross-attention is carried over untouched.
    pub fn advance(self, next: SelfAttentionCache) -> Result<Self> {
        let expected = self.seq_len() + 1;

        for (layer, pair) in next.layers.iter().enumerate() {
            for got in [pair.key.len_of(Axis(2)), pair.value.len_of(Axis(2))] {
                if got != expected {
                    return Err(ModelError::CacheLength {
                        layer,
                        expected,
                        got,
                    }
                    .into());
                }
            }
        }

        Ok(Self {
            self_attention: next,
            ..self
        })
    }
}
