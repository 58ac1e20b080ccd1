use ndarray::{concatenate, Array1, Array2, Array3, Array4, Axis};

use crate::vision::preprocess::INPUT_CHANNELS;
use crate::vision::weights::{TensorStore, WeightsError};

/// Network geometry: `depth` pooling stages doubling the filter count from
/// `base_filters`, a bottleneck at `base_filters << depth`, and a symmetric
/// decoder with skip connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Architecture {
    pub input_size: u32,
    pub base_filters: usize,
    pub depth: usize,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            input_size: 256,
            base_filters: 64,
            depth: 3,
        }
    }
}

impl Architecture {
    pub fn validate(&self) -> Result<(), WeightsError> {
        let stride = 1u32 << self.depth;
        if self.base_filters == 0
            || self.depth == 0
            || self.input_size == 0
            || self.input_size % stride != 0
        {
            return Err(WeightsError::Geometry {
                input_size: self.input_size,
                base_filters: self.base_filters,
                depth: self.depth,
            });
        }
        Ok(())
    }
}

pub struct Conv2d {
    weight: Array4<f32>, // (out, in, k, k)
    bias: Array1<f32>,
}

impl Conv2d {
    fn from_store(
        store: &mut TensorStore,
        out_c: usize,
        in_c: usize,
        k: usize,
    ) -> Result<Self, WeightsError> {
        let w = store.take(out_c * in_c * k * k)?;
        let weight =
            Array4::from_shape_vec((out_c, in_c, k, k), w).map_err(|_| WeightsError::Layout)?;
        let bias = Array1::from_vec(store.take(out_c)?);
        Ok(Self { weight, bias })
    }

    /// Stride-1 convolution with same padding.
    pub fn forward(&self, input: &Array3<f32>) -> Array3<f32> {
        let (out_c, in_c, k, _) = self.weight.dim();
        let (_, h, w) = input.dim();
        let pad = (k / 2) as isize;

        let mut out = Array3::zeros((out_c, h, w));
        for oc in 0..out_c {
            for y in 0..h {
                for x in 0..w {
                    let mut acc = self.bias[oc];
                    for ic in 0..in_c {
                        for ky in 0..k {
                            let iy = y as isize + ky as isize - pad;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            for kx in 0..k {
                                let ix = x as isize + kx as isize - pad;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                acc += input[[ic, iy as usize, ix as usize]]
                                    * self.weight[[oc, ic, ky, kx]];
                            }
                        }
                    }
                    out[[oc, y, x]] = acc;
                }
            }
        }
        out
    }
}

fn relu(x: &mut Array3<f32>) {
    x.mapv_inplace(|v| v.max(0.0));
}

/// Two 3x3 convolutions, each followed by ReLU.
pub struct ConvBlock {
    conv1: Conv2d,
    conv2: Conv2d,
}

impl ConvBlock {
    fn from_store(store: &mut TensorStore, in_c: usize, out_c: usize) -> Result<Self, WeightsError> {
        Ok(Self {
            conv1: Conv2d::from_store(store, out_c, in_c, 3)?,
            conv2: Conv2d::from_store(store, out_c, out_c, 3)?,
        })
    }

    pub fn forward(&self, input: &Array3<f32>) -> Array3<f32> {
        let mut x = self.conv1.forward(input);
        relu(&mut x);
        let mut x = self.conv2.forward(&x);
        relu(&mut x);
        x
    }
}

pub fn max_pool2(input: &Array3<f32>) -> Array3<f32> {
    let (c, h, w) = input.dim();
    let (oh, ow) = (h / 2, w / 2);
    let mut out = Array3::zeros((c, oh, ow));
    for ch in 0..c {
        for y in 0..oh {
            for x in 0..ow {
                let mut m = f32::NEG_INFINITY;
                for dy in 0..2 {
                    for dx in 0..2 {
                        m = m.max(input[[ch, 2 * y + dy, 2 * x + dx]]);
                    }
                }
                out[[ch, y, x]] = m;
            }
        }
    }
    out
}

/// 2x2 stride-2 transposed convolution; doubles spatial resolution.
pub struct UpConv {
    weight: Array4<f32>, // (in, out, 2, 2)
    bias: Array1<f32>,
}

impl UpConv {
    fn from_store(store: &mut TensorStore, in_c: usize, out_c: usize) -> Result<Self, WeightsError> {
        let w = store.take(in_c * out_c * 4)?;
        let weight =
            Array4::from_shape_vec((in_c, out_c, 2, 2), w).map_err(|_| WeightsError::Layout)?;
        let bias = Array1::from_vec(store.take(out_c)?);
        Ok(Self { weight, bias })
    }

    pub fn forward(&self, input: &Array3<f32>) -> Array3<f32> {
        let (in_c, out_c, kh, kw) = self.weight.dim();
        let (_, h, w) = input.dim();

        let mut out = Array3::zeros((out_c, h * 2, w * 2));
        for oc in 0..out_c {
            out.index_axis_mut(Axis(0), oc).fill(self.bias[oc]);
        }
        for ic in 0..in_c {
            for y in 0..h {
                for x in 0..w {
                    let v = input[[ic, y, x]];
                    if v == 0.0 {
                        continue;
                    }
                    for oc in 0..out_c {
                        for ky in 0..kh {
                            for kx in 0..kw {
                                out[[oc, 2 * y + ky, 2 * x + kx]] +=
                                    v * self.weight[[ic, oc, ky, kx]];
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn concat_channels(a: &Array3<f32>, b: &Array3<f32>) -> Array3<f32> {
    concatenate(Axis(0), &[a.view(), b.view()])
        .expect("skip and upsampled feature maps must share spatial dims")
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Encoder-decoder segmentation network. Skip connections carry encoder
/// features to the matching decoder stage so lesion boundaries survive the
/// downsampling path.
pub struct UNet {
    arch: Architecture,
    encoders: Vec<ConvBlock>,
    bottleneck: ConvBlock,
    ups: Vec<UpConv>,
    decoders: Vec<ConvBlock>,
    head: Conv2d,
}

impl UNet {
    /// Consume tensors from `store` in the canonical export order: encoder
    /// blocks shallow to deep (conv1 w/b, conv2 w/b each), bottleneck, then
    /// per decoder stage deep to shallow (up w/b, conv1 w/b, conv2 w/b),
    /// and finally the 1x1 head.
    pub fn build(arch: Architecture, store: &mut TensorStore) -> Result<Self, WeightsError> {
        arch.validate()?;

        let mut encoders = Vec::with_capacity(arch.depth);
        let mut in_c = INPUT_CHANNELS;
        for i in 0..arch.depth {
            let out_c = arch.base_filters << i;
            encoders.push(ConvBlock::from_store(store, in_c, out_c)?);
            in_c = out_c;
        }

        let bottleneck = ConvBlock::from_store(store, in_c, arch.base_filters << arch.depth)?;

        let mut ups = Vec::with_capacity(arch.depth);
        let mut decoders = Vec::with_capacity(arch.depth);
        let mut hi_c = arch.base_filters << arch.depth;
        for i in (0..arch.depth).rev() {
            let lo_c = arch.base_filters << i;
            ups.push(UpConv::from_store(store, hi_c, lo_c)?);
            decoders.push(ConvBlock::from_store(store, lo_c * 2, lo_c)?);
            hi_c = lo_c;
        }

        let head = Conv2d::from_store(store, 1, arch.base_filters, 1)?;

        if !store.is_empty() {
            return Err(WeightsError::TrailingTensors(store.remaining()));
        }

        Ok(Self {
            arch,
            encoders,
            bottleneck,
            ups,
            decoders,
            head,
        })
    }

    pub fn input_size(&self) -> u32 {
        self.arch.input_size
    }

    /// Full forward pass; returns the per-pixel disease probability grid at
    /// the input resolution. Purely deterministic, no stochastic layers.
    pub fn forward(&self, input: &Array3<f32>) -> Array2<f32> {
        let mut skips: Vec<Array3<f32>> = Vec::with_capacity(self.encoders.len());
        let mut x = input.clone();
        for block in &self.encoders {
            let features = block.forward(&x);
            x = max_pool2(&features);
            skips.push(features);
        }

        x = self.bottleneck.forward(&x);

        for (i, (up, dec)) in self.ups.iter().zip(&self.decoders).enumerate() {
            let upsampled = up.forward(&x);
            let skip = &skips[skips.len() - 1 - i];
            let merged = concat_channels(skip, &upsampled);
            x = dec.forward(&merged);
        }

        let logits = self.head.forward(&x);
        logits.index_axis(Axis(0), 0).mapv(sigmoid)
    }
}

/// Element counts of every tensor `build` expects, in consumption order.
/// The weights exporter and the tests both derive from this single list.
pub fn tensor_lengths(arch: &Architecture) -> Vec<usize> {
    let conv = |out: usize, inp: usize, k: usize| [out * inp * k * k, out];
    let mut lens = Vec::new();

    let mut in_c = INPUT_CHANNELS;
    for i in 0..arch.depth {
        let out_c = arch.base_filters << i;
        lens.extend(conv(out_c, in_c, 3));
        lens.extend(conv(out_c, out_c, 3));
        in_c = out_c;
    }

    let bott_c = arch.base_filters << arch.depth;
    lens.extend(conv(bott_c, in_c, 3));
    lens.extend(conv(bott_c, bott_c, 3));

    let mut hi_c = bott_c;
    for i in (0..arch.depth).rev() {
        let lo_c = arch.base_filters << i;
        lens.extend([hi_c * lo_c * 4, lo_c]);
        lens.extend(conv(lo_c, lo_c * 2, 3));
        lens.extend(conv(lo_c, lo_c, 3));
        hi_c = lo_c;
    }

    lens.extend(conv(1, arch.base_filters, 1));
    lens
}
