use std::str::FromStr;

use anyhow::{bail, Result};
use burn::{
    module::Ignored,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        conv::{Conv1d, Conv1dConfig},
        pool::{MaxPool1d, MaxPool1dConfig},
        BatchNorm, BatchNormConfig,
        BiLstm, BiLstmConfig,
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
        PaddingConfig1d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONV_DROPOUT:   f64 = 0.1;
const MIXER_DROPOUT:  f64 = 0.1;
const FFN_DROPOUT:    f64 = 0.2;
const DENSE_DROPOUT:  f64 = 0.5;
const NORM_EPSILON:   f64 = 1e-6;
// Keras defaults: moving average 0.99 → Burn momentum 0.01
const BN_MOMENTUM:    f64 = 0.01;
const BN_EPSILON:     f64 = 1e-3;

// ─── Stage configuration ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvActivation {
    Relu,
    Exponential,
}

/// Bidirectional LSTM; `units` is the concatenated width of both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentStage {
    pub units: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionStage {
    /// One multi-head self-attention layer with residual + post-norm
    SelfAttention { heads: usize, key_size: usize },
    /// `layers` transformer encoder blocks
    Transformer { layers: usize, heads: usize, key_size: usize, ffn_units: usize },
}

impl AttentionStage {
    fn key_size(&self) -> usize {
        match self {
            Self::SelfAttention { key_size, .. } | Self::Transformer { key_size, .. } => *key_size,
        }
    }

    fn heads(&self) -> usize {
        match self {
            Self::SelfAttention { heads, .. } | Self::Transformer { heads, .. } => *heads,
        }
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct MotifNetConfig {
    #[config(default = 200)]
    pub seq_len:     usize,
    #[config(default = 4)]
    pub channels:    usize,
    #[config(default = 32)]
    pub num_filters: usize,
    #[config(default = 19)]
    pub kernel_size: usize,
    #[config(default = true)]
    pub batch_norm:  bool,
    #[config(default = "ConvActivation::Relu")]
    pub activation:  ConvActivation,
    #[config(default = 4)]
    pub pool_size:   usize,
    #[config(default = "None")]
    pub recurrent:   Option<RecurrentStage>,
    #[config(default = "None")]
    pub attention:   Option<AttentionStage>,
    #[config(default = 512)]
    pub dense_units: usize,
    #[config(default = 12)]
    pub num_out:     usize,
}

impl MotifNetConfig {
    /// Reject stage combinations whose shapes cannot compose.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("seq_len", self.seq_len),
            ("channels", self.channels),
            ("num_filters", self.num_filters),
            ("kernel_size", self.kernel_size),
            ("pool_size", self.pool_size),
            ("dense_units", self.dense_units),
            ("num_out", self.num_out),
        ] {
            if v == 0 {
                bail!("{name} must be positive");
            }
        }
        if self.pool_size > self.seq_len {
            bail!("pool_size {} exceeds sequence length {}", self.pool_size, self.seq_len);
        }
        if let Some(r) = &self.recurrent {
            if r.units == 0 || r.units % 2 != 0 {
                bail!("recurrent units must be a positive even number, got {}", r.units);
            }
        }
        if let Some(a) = &self.attention {
            if a.heads() == 0 || a.key_size() == 0 || a.key_size() % a.heads() != 0 {
                bail!("key_size {} must be a positive multiple of heads {}", a.key_size(), a.heads());
            }
            if let AttentionStage::Transformer { layers, ffn_units, .. } = a {
                if *layers == 0 || *ffn_units == 0 {
                    bail!("transformer needs at least one layer and a positive ffn width");
                }
            }
        }
        Ok(())
    }

    /// Positions left after max pooling (kernel = stride = pool_size)
    pub fn pooled_len(&self) -> usize {
        (self.seq_len - self.pool_size) / self.pool_size + 1
    }

    /// Feature width entering the flatten stage
    pub fn mixer_width(&self) -> usize {
        match (&self.recurrent, &self.attention) {
            (_, Some(a))    => a.key_size(),
            (Some(r), None) => r.units,
            (None, None)    => self.num_filters,
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> MotifNet<B> {
        let conv = Conv1dConfig::new(self.channels, self.num_filters, self.kernel_size)
            .with_padding(PaddingConfig1d::Same)
            .with_bias(false)
            .init(device);
        let conv_norm = self.batch_norm.then(|| batch_norm(self.num_filters, device));
        let pool = MaxPool1dConfig::new(self.pool_size)
            .with_stride(self.pool_size)
            .init();

        let mut width = self.num_filters;
        let recurrent = self.recurrent.as_ref().map(|r| {
            let lstm = BiLstmConfig::new(width, r.units / 2, true).init(device);
            width = r.units;
            lstm
        });

        let (attention, transformer) = match &self.attention {
            None => (None, None),
            Some(AttentionStage::SelfAttention { heads, key_size }) => {
                let block = AttentionBlock {
                    projection: projection(width, *key_size, device),
                    attention:  mha(*key_size, *heads, device),
                    norm:       LayerNormConfig::new(*key_size).with_epsilon(NORM_EPSILON).init(device),
                    dropout:    DropoutConfig::new(MIXER_DROPOUT).init(),
                };
                (Some(block), None)
            }
            Some(AttentionStage::Transformer { layers, heads, key_size, ffn_units }) => {
                let stack = TransformerStack {
                    projection: projection(width, *key_size, device),
                    input_norm: LayerNormConfig::new(*key_size).with_epsilon(NORM_EPSILON).init(device),
                    blocks:     (0..*layers)
                        .map(|_| EncoderBlock::new(*key_size, *heads, *ffn_units, device))
                        .collect(),
                };
                (None, Some(stack))
            }
        };

        let flat = self.pooled_len() * self.mixer_width();
        MotifNet {
            conv,
            conv_norm,
            activation:    Ignored(self.activation),
            pool,
            conv_dropout:  DropoutConfig::new(CONV_DROPOUT).init(),
            recurrent,
            mixer_dropout: DropoutConfig::new(MIXER_DROPOUT).init(),
            attention,
            transformer,
            dense:         LinearConfig::new(flat, self.dense_units).with_bias(false).init(device),
            dense_norm:    batch_norm(self.dense_units, device),
            dense_dropout: DropoutConfig::new(DENSE_DROPOUT).init(),
            head:          LinearConfig::new(self.dense_units, self.num_out).init(device),
        }
    }
}

fn batch_norm<B: Backend>(features: usize, device: &B::Device) -> BatchNorm<B, 1> {
    BatchNormConfig::new(features)
        .with_momentum(BN_MOMENTUM)
        .with_epsilon(BN_EPSILON)
        .init(device)
}

fn mha<B: Backend>(d_model: usize, heads: usize, device: &B::Device) -> MultiHeadAttention<B> {
    MultiHeadAttentionConfig::new(d_model, heads)
        .with_dropout(0.0)
        .init(device)
}

fn projection<B: Backend>(from: usize, to: usize, device: &B::Device) -> Option<Linear<B>> {
    (from != to).then(|| LinearConfig::new(from, to).with_bias(false).init(device))
}

// ─── Architecture presets ────────────────────────────────────────────────────

/// The six model families the experiments compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    Cnn,
    CnnAtt,
    CnnLstm,
    CnnLstmAtt,
    CnnTrans,
    CnnLstmTrans,
}

/// Hyperparameters shared by every preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureParams {
    pub num_filters:        usize,
    pub batch_norm:         bool,
    pub activation:         ConvActivation,
    pub pool_size:          usize,
    pub lstm_units:         usize,
    pub heads:              usize,
    pub key_size:           usize,
    pub transformer_layers: usize,
    pub ffn_units:          usize,
    pub dense_units:        usize,
    pub num_out:            usize,
}

impl Default for ArchitectureParams {
    fn default() -> Self {
        Self {
            num_filters:        32,
            batch_norm:         true,
            activation:         ConvActivation::Relu,
            pool_size:          4,
            lstm_units:         128,
            heads:              8,
            key_size:           64,
            transformer_layers: 1,
            ffn_units:          32,
            dense_units:        512,
            num_out:            12,
        }
    }
}

impl Architecture {
    pub fn config(self, seq_len: usize, p: &ArchitectureParams) -> MotifNetConfig {
        let self_attention = AttentionStage::SelfAttention { heads: p.heads, key_size: p.key_size };
        let transformer = AttentionStage::Transformer {
            layers:    p.transformer_layers,
            heads:     p.heads,
            key_size:  p.key_size,
            ffn_units: p.ffn_units,
        };
        let (recurrent, attention) = match self {
            Self::Cnn          => (None, None),
            Self::CnnAtt       => (None, Some(self_attention)),
            Self::CnnLstm      => (Some(p.lstm_units), None),
            Self::CnnLstmAtt   => (Some(p.lstm_units), Some(self_attention)),
            Self::CnnTrans     => (None, Some(transformer)),
            // the recurrent block feeds the transformer directly, so it is key_size wide
            Self::CnnLstmTrans => (Some(p.key_size), Some(transformer)),
        };
        MotifNetConfig::new()
            .with_seq_len(seq_len)
            .with_num_filters(p.num_filters)
            .with_batch_norm(p.batch_norm)
            .with_activation(p.activation)
            .with_pool_size(p.pool_size)
            .with_recurrent(recurrent.map(|units| RecurrentStage { units }))
            .with_attention(attention)
            .with_dense_units(p.dense_units)
            .with_num_out(p.num_out)
    }
}

// ─── Layer tags ──────────────────────────────────────────────────────────────

/// Stable names for the layers that analysis code reads from.
/// Looking a layer up by tag is the only supported way to reach
/// an intermediate output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerTag {
    /// First-layer filter activations, [N, positions, filters]
    ConvActivation,
}

impl LayerTag {
    pub const ALL: [LayerTag; 1] = [LayerTag::ConvActivation];

    pub fn name(self) -> &'static str {
        match self {
            Self::ConvActivation => "conv_activation",
        }
    }
}

#[derive(Debug, Error)]
#[error("no layer tagged '{0}' (known tags: conv_activation)")]
pub struct LayerLookupError(pub String);

impl FromStr for LayerTag {
    type Err = LayerLookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| LayerLookupError(s.to_string()))
    }
}

// ─── Forward-pass semantics ──────────────────────────────────────────────────

/// `Standard` lets each module decide train vs inference from the
/// backend (autodiff = training). `Frozen` always uses running
/// BatchNorm statistics and skips dropout, so gradients w.r.t. the
/// input can be taken through an inference-mode network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    Standard,
    Frozen,
}

impl Pass {
    fn dropout<B: Backend, const D: usize>(self, dropout: &Dropout, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Standard => dropout.forward(x),
            Self::Frozen   => x,
        }
    }

    fn norm<B: Backend>(self, norm: &BatchNorm<B, 1>, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            Self::Standard => norm.forward(x),
            Self::Frozen   => frozen_norm(norm, x),
        }
    }
}

/// BatchNorm with running statistics on [N, C, L].
fn frozen_norm<B: Backend>(norm: &BatchNorm<B, 1>, x: Tensor<B, 3>) -> Tensor<B, 3> {
    let channels = x.dims()[1];
    let mean  = norm.running_mean.value().reshape([1, channels, 1]);
    let var   = norm.running_var.value().reshape([1, channels, 1]);
    let gamma = norm.gamma.val().reshape([1, channels, 1]);
    let beta  = norm.beta.val().reshape([1, channels, 1]);
    (x - mean) / (var + norm.epsilon).sqrt() * gamma + beta
}

// ─── Modules ─────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct AttentionBlock<B: Backend> {
    projection: Option<Linear<B>>,
    attention:  MultiHeadAttention<B>,
    norm:       LayerNorm<B>,
    dropout:    Dropout,
}

impl<B: Backend> AttentionBlock<B> {
    fn forward(&self, x: Tensor<B, 3>, pass: Pass) -> Tensor<B, 3> {
        let x = match &self.projection {
            Some(p) => p.forward(x),
            None    => x,
        };
        let attended = self.attention.forward(MhaInput::self_attn(x.clone())).context;
        self.norm.forward(x + pass.dropout(&self.dropout, attended))
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    self_attn:    MultiHeadAttention<B>,
    ffn_linear1:  Linear<B>,
    ffn_linear2:  Linear<B>,
    norm1:        LayerNorm<B>,
    norm2:        LayerNorm<B>,
    attn_dropout: Dropout,
    ffn_dropout:  Dropout,
    out_dropout:  Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    fn new(d_model: usize, heads: usize, d_ff: usize, device: &B::Device) -> Self {
        Self {
            self_attn:    mha(d_model, heads, device),
            ffn_linear1:  LinearConfig::new(d_model, d_ff).init(device),
            ffn_linear2:  LinearConfig::new(d_ff, d_model).init(device),
            norm1:        LayerNormConfig::new(d_model).with_epsilon(NORM_EPSILON).init(device),
            norm2:        LayerNormConfig::new(d_model).with_epsilon(NORM_EPSILON).init(device),
            attn_dropout: DropoutConfig::new(MIXER_DROPOUT).init(),
            ffn_dropout:  DropoutConfig::new(FFN_DROPOUT).init(),
            out_dropout:  DropoutConfig::new(MIXER_DROPOUT).init(),
        }
    }

    fn forward(&self, x: Tensor<B, 3>, pass: Pass) -> Tensor<B, 3> {
        let attn_output = self.self_attn.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + pass.dropout(&self.attn_dropout, attn_output));
        let hidden = pass.dropout(&self.ffn_dropout, relu(self.ffn_linear1.forward(x.clone())));
        let ffn_out = self.ffn_linear2.forward(hidden);
        self.norm2.forward(x + pass.dropout(&self.out_dropout, ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerStack<B: Backend> {
    projection: Option<Linear<B>>,
    input_norm: LayerNorm<B>,
    blocks:     Vec<EncoderBlock<B>>,
}

impl<B: Backend> TransformerStack<B> {
    fn forward(&self, x: Tensor<B, 3>, pass: Pass) -> Tensor<B, 3> {
        let x = match &self.projection {
            Some(p) => p.forward(x),
            None    => x,
        };
        let mut x = self.input_norm.forward(x);
        for block in &self.blocks {
            x = block.forward(x, pass);
        }
        x
    }
}

#[derive(Module, Debug)]
pub struct MotifNet<B: Backend> {
    conv:          Conv1d<B>,
    conv_norm:     Option<BatchNorm<B, 1>>,
    activation:    Ignored<ConvActivation>,
    pool:          MaxPool1d,
    conv_dropout:  Dropout,
    recurrent:     Option<BiLstm<B>>,
    mixer_dropout: Dropout,
    attention:     Option<AttentionBlock<B>>,
    transformer:   Option<TransformerStack<B>>,
    dense:         Linear<B>,
    dense_norm:    BatchNorm<B, 1>,
    dense_dropout: Dropout,
    head:          Linear<B>,
}

impl<B: Backend> MotifNet<B> {
    /// sequences: [batch, positions, 4] → probabilities: [batch, num_out]
    pub fn forward(&self, sequences: Tensor<B, 3>) -> Tensor<B, 2> {
        sigmoid(self.forward_logits(sequences))
    }

    /// Pre-sigmoid scores, used by the BCE-with-logits loss.
    pub fn forward_logits(&self, sequences: Tensor<B, 3>) -> Tensor<B, 2> {
        self.body(sequences, Pass::Standard)
    }

    /// Inference-mode probabilities on any backend (see `Pass`).
    pub fn forward_frozen(&self, sequences: Tensor<B, 3>) -> Tensor<B, 2> {
        sigmoid(self.body(sequences, Pass::Frozen))
    }

    /// Output of the tagged layer, channels-last: [batch, positions, features].
    pub fn tap(&self, sequences: Tensor<B, 3>, tag: LayerTag) -> Tensor<B, 3> {
        match tag {
            LayerTag::ConvActivation => self.conv_activation(sequences, Pass::Standard).swap_dims(1, 2),
        }
    }

    /// [N, L, 4] → [N, filters, L]
    fn conv_activation(&self, sequences: Tensor<B, 3>, pass: Pass) -> Tensor<B, 3> {
        let x = self.conv.forward(sequences.swap_dims(1, 2));
        let x = match &self.conv_norm {
            Some(norm) => pass.norm(norm, x),
            None       => x,
        };
        match *self.activation {
            ConvActivation::Relu        => relu(x),
            ConvActivation::Exponential => x.exp(),
        }
    }

    fn body(&self, sequences: Tensor<B, 3>, pass: Pass) -> Tensor<B, 2> {
        let x = self.conv_activation(sequences, pass);
        let x = pass.dropout(&self.conv_dropout, self.pool.forward(x));

        // Sequence mixers work on [N, positions, features]
        let mut x = x.swap_dims(1, 2);
        if let Some(lstm) = &self.recurrent {
            let (output, _) = lstm.forward(x, None);
            x = pass.dropout(&self.mixer_dropout, output);
        }
        if let Some(block) = &self.attention {
            x = block.forward(x, pass);
        }
        if let Some(stack) = &self.transformer {
            x = stack.forward(x, pass);
        }

        let x = self.dense.forward(x.flatten::<2>(1, 2));
        // BatchNorm1d wants a trailing spatial axis
        let x = pass.norm(&self.dense_norm, x.unsqueeze_dim::<3>(2)).squeeze::<2>(2);
        let x = pass.dropout(&self.dense_dropout, relu(x));
        self.head.forward(x)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::BACKEND_LOCK;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TB = NdArray;

    fn small_params() -> ArchitectureParams {
        ArchitectureParams {
            num_filters:        8,
            pool_size:          4,
            lstm_units:         8,
            heads:              2,
            key_size:           8,
            dense_units:        16,
            num_out:            3,
            ..ArchitectureParams::default()
        }
    }

    fn one_hot_batch(n: usize, len: usize) -> Tensor<TB, 3> {
        let values: Vec<f32> = (0..n * len * 4)
            .map(|i| if (i / 4 + i / (len * 4)) % 4 == i % 4 { 1.0 } else { 0.0 })
            .collect();
        Tensor::from_data(TensorData::new(values, [n, len, 4]), &Default::default())
    }

    #[test]
    fn test_every_architecture_outputs_probabilities() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let device = Default::default();
        for arch in [
            Architecture::Cnn,
            Architecture::CnnAtt,
            Architecture::CnnLstm,
            Architecture::CnnLstmAtt,
            Architecture::CnnTrans,
            Architecture::CnnLstmTrans,
        ] {
            let cfg = arch.config(40, &small_params());
            cfg.validate().unwrap();
            let model: MotifNet<TB> = cfg.init(&device);
            let out = model.forward(one_hot_batch(5, 40));
            assert_eq!(out.dims(), [5, 3], "{arch:?}");
            let values: Vec<f32> = out.into_data().convert::<f32>().to_vec().unwrap();
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)), "{arch:?}");
        }
    }

    #[test]
    fn test_full_size_input_shape() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cfg = MotifNetConfig::new().with_num_filters(8).with_dense_units(16);
        let model: MotifNet<TB> = cfg.init(&Default::default());
        let out = model.forward(one_hot_batch(2, 200));
        assert_eq!(out.dims(), [2, 12]);
    }

    #[test]
    fn test_tap_returns_channels_last_activations() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cfg = Architecture::Cnn.config(40, &small_params());
        let model: MotifNet<TB> = cfg.init(&Default::default());
        let act = model.tap(one_hot_batch(3, 40), LayerTag::ConvActivation);
        assert_eq!(act.dims(), [3, 40, 8]);
        let values: Vec<f32> = act.into_data().convert::<f32>().to_vec().unwrap();
        assert!(values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_frozen_pass_matches_inference_backend() {
        let _guard = BACKEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let device = Default::default();
        let cfg = Architecture::CnnAtt.config(40, &small_params());
        let model: MotifNet<TB> = cfg.init(&device);
        let x = Tensor::<TB, 3>::random([4, 40, 4], Distribution::Uniform(0.0, 1.0), &device);
        let standard: Vec<f32> = model.forward(x.clone()).into_data().convert::<f32>().to_vec().unwrap();
        let frozen: Vec<f32> = model.forward_frozen(x).into_data().convert::<f32>().to_vec().unwrap();
        for (a, b) in standard.iter().zip(&frozen) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn test_layer_tag_lookup() {
        assert_eq!("conv_activation".parse::<LayerTag>().unwrap(), LayerTag::ConvActivation);
        let err = "dense_1".parse::<LayerTag>().unwrap_err();
        assert_eq!(err.0, "dense_1");
    }

    #[test]
    fn test_validate_rejects_bad_heads() {
        let mut params = small_params();
        params.key_size = 10;
        params.heads = 4;
        assert!(Architecture::CnnAtt.config(40, &params).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_odd_recurrent_width() {
        let mut params = small_params();
        params.lstm_units = 7;
        assert!(Architecture::CnnLstm.config(40, &params).validate().is_err());
    }

    #[test]
    fn test_pooled_len_and_width() {
        let cfg = Architecture::CnnLstmTrans.config(200, &ArchitectureParams::default());
        assert_eq!(cfg.pooled_len(), 50);
        assert_eq!(cfg.mixer_width(), 64);
        assert_eq!(cfg.recurrent, Some(RecurrentStage { units: 64 }));
    }
}
