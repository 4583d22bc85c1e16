//! Fully connected network $x |-> (Re u, Im u)$ used as trial function of the VPINN.
//!
//! The spatial derivative $u'(x)$ is available through three interchangeable strategies,
//! parameter gradients through a reverse pass over the forward trace of values and tangents.

use crate::{basis::Basis, problem::{ConfigError, Domain}, Complex64};

use num_dual::{Dual64, DualNum};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
  #[default]
  Tanh,
  Sigmoid,
  Sin,
}
impl Activation {
  pub fn eval<T: DualNum<f64> + Copy>(&self, z: T) -> T {
    match self {
      Self::Tanh => z.tanh(),
      Self::Sigmoid => (T::from(1.0) + (-z).exp()).recip(),
      Self::Sin => z.sin(),
    }
  }

  /// $sigma(z)$, $sigma'(z)$ and $sigma''(z)$.
  pub fn derivatives(&self, z: f64) -> [f64; 3] {
    match self {
      Self::Tanh => {
        let t = z.tanh();
        let d1 = 1.0 - t * t;
        [t, d1, -2.0 * t * d1]
      }
      Self::Sigmoid => {
        let s = 1.0 / (1.0 + (-z).exp());
        let d1 = s * (1.0 - s);
        [s, d1, d1 * (1.0 - 2.0 * s)]
      }
      Self::Sin => {
        let (s, c) = z.sin_cos();
        [s, c, -s]
      }
    }
  }
}

/// How $u'(x)$ is computed behind [`Basis::derivative`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SpatialDerivative {
  /// Tangent propagation alongside the forward pass.
  #[default]
  Tangent,
  /// Forward-mode automatic differentiation with dual numbers.
  Dual,
  /// Central difference quotient.
  FiniteDifference { step: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
  /// Number of hidden layers.
  pub depth: usize,
  /// Neurons per hidden layer.
  pub width: usize,
  pub activation: Activation,
  pub derivative: SpatialDerivative,
  /// Range of the uniformly initialized hidden biases, the domain if `None`.
  pub bias_range: Option<[f64; 2]>,
  /// Gain of the Xavier-normal weight initialization.
  pub weight_gain: f64,
  pub seed: u64,
}
impl Default for NetworkConfig {
  fn default() -> Self {
    Self {
      depth: 1,
      width: 20,
      activation: Activation::Tanh,
      derivative: SpatialDerivative::Tangent,
      bias_range: None,
      weight_gain: 5.0 / 3.0,
      seed: 0,
    }
  }
}
impl NetworkConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.depth == 0 || self.width == 0 {
      return Err(ConfigError::InvalidNetwork(format!(
        "need at least one hidden layer with one neuron, got depth={} width={}",
        self.depth, self.width
      )));
    }
    if !(self.weight_gain.is_finite() && self.weight_gain > 0.0) {
      return Err(ConfigError::InvalidNetwork(format!(
        "weight gain must be positive, got {}",
        self.weight_gain
      )));
    }
    if let Some([lo, hi]) = self.bias_range {
      if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        return Err(ConfigError::InvalidNetwork(format!(
          "invalid bias range [{lo}, {hi}]"
        )));
      }
    }
    if let SpatialDerivative::FiniteDifference { step } = self.derivative {
      if !(step.is_finite() && step > 0.0) {
        return Err(ConfigError::InvalidNetwork(format!(
          "finite difference step must be positive, got {step}"
        )));
      }
    }
    Ok(())
  }
}

/// Affine map $h |-> W h + b$.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
  pub weights: na::DMatrix<f64>,
  pub biases: na::DVector<f64>,
}
impl Layer {
  pub fn zeros(nout: usize, nin: usize) -> Self {
    Self {
      weights: na::DMatrix::zeros(nout, nin),
      biases: na::DVector::zeros(nout),
    }
  }
  pub fn nin(&self) -> usize {
    self.weights.ncols()
  }
  pub fn nout(&self) -> usize {
    self.weights.nrows()
  }
  pub fn nparams(&self) -> usize {
    self.weights.len() + self.biases.len()
  }

  fn apply<T: DualNum<f64> + Copy>(&self, input: &[T]) -> Vec<T> {
    (0..self.nout())
      .map(|i| {
        let mut z = T::from(self.biases[i]);
        for (j, &h) in input.iter().enumerate() {
          z = z + T::from(self.weights[(i, j)]) * h;
        }
        z
      })
      .collect()
  }
}

/// Values and tangents of every hidden layer at one input.
#[derive(Debug, Clone)]
pub struct Trace {
  input: f64,
  /// $(z, dot(z), h, dot(h))$ per hidden layer.
  hidden: Vec<[na::DVector<f64>; 4]>,
  pub value: Complex64,
  pub derivative: Complex64,
}

#[derive(Debug, Clone)]
pub struct Network {
  hidden: Vec<Layer>,
  /// Linear, two outputs.
  output: Layer,
  activation: Activation,
  derivative: SpatialDerivative,
}

impl Network {
  /// Xavier-normal weights, uniform hidden biases and zero output biases, from a seeded generator.
  pub fn new(config: &NetworkConfig, domain: &Domain) -> Result<Self, ConfigError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let [lo, hi] = config.bias_range.unwrap_or(domain.bounds());
    let bias_dist = Uniform::new(lo, hi);

    let mut dims = vec![1];
    dims.extend(std::iter::repeat(config.width).take(config.depth));
    dims.push(2);

    let nlayers = dims.len() - 1;
    let mut layers = Vec::with_capacity(nlayers);
    for (ilayer, (&nin, &nout)) in dims.iter().zip(&dims[1..]).enumerate() {
      let std = config.weight_gain * (2.0 / (nin + nout) as f64).sqrt();
      let weight_dist =
        Normal::new(0.0, std).map_err(|e| ConfigError::InvalidNetwork(e.to_string()))?;
      let weights = na::DMatrix::from_fn(nout, nin, |_, _| weight_dist.sample(&mut rng));
      let biases = if ilayer + 1 == nlayers {
        na::DVector::zeros(nout)
      } else {
        na::DVector::from_fn(nout, |_, _| bias_dist.sample(&mut rng))
      };
      layers.push(Layer { weights, biases });
    }

    Self::from_layers(layers, config.activation, config.derivative)
  }

  /// Network from explicit layers.
  /// The first layer takes one input, the last one yields two outputs.
  pub fn from_layers(
    mut layers: Vec<Layer>,
    activation: Activation,
    derivative: SpatialDerivative,
  ) -> Result<Self, ConfigError> {
    let valid = layers.len() >= 2
      && layers.first().map(Layer::nin) == Some(1)
      && layers.last().map(Layer::nout) == Some(2)
      && layers.windows(2).all(|w| w[0].nout() == w[1].nin())
      && layers.iter().all(|l| l.biases.len() == l.nout());
    let (true, Some(output)) = (valid, layers.pop()) else {
      return Err(ConfigError::InvalidNetwork(
        "layer dimensions do not chain from 1 input to 2 outputs".into(),
      ));
    };
    Ok(Self {
      hidden: layers,
      output,
      activation,
      derivative,
    })
  }

  /// Hidden layers followed by the output layer.
  pub fn layers(&self) -> impl Iterator<Item = &Layer> {
    self.hidden.iter().chain(std::iter::once(&self.output))
  }
  pub fn output_layer(&self) -> &Layer {
    &self.output
  }
  pub fn activation(&self) -> Activation {
    self.activation
  }
  pub fn spatial_derivative(&self) -> SpatialDerivative {
    self.derivative
  }
  pub fn with_spatial_derivative(mut self, derivative: SpatialDerivative) -> Self {
    self.derivative = derivative;
    self
  }
  pub fn depth(&self) -> usize {
    self.hidden.len()
  }
  pub fn nparams(&self) -> usize {
    self.layers().map(Layer::nparams).sum()
  }

  /// All weights (column-major) and biases, layer by layer.
  pub fn params(&self) -> na::DVector<f64> {
    flatten(self.layers())
  }

  pub fn set_params(&mut self, params: &na::DVector<f64>) {
    assert_eq!(params.len(), self.nparams());
    let mut offset = 0;
    for layer in self.hidden.iter_mut().chain(std::iter::once(&mut self.output)) {
      let nw = layer.weights.len();
      layer
        .weights
        .as_mut_slice()
        .copy_from_slice(&params.as_slice()[offset..offset + nw]);
      offset += nw;
      let nb = layer.biases.len();
      layer
        .biases
        .as_mut_slice()
        .copy_from_slice(&params.as_slice()[offset..offset + nb]);
      offset += nb;
    }
  }

  /// Forward pass, generic over the number type.
  pub fn forward<T: DualNum<f64> + Copy>(&self, x: T) -> [T; 2] {
    let mut h = vec![x];
    for layer in &self.hidden {
      h = layer
        .apply(&h)
        .into_iter()
        .map(|z| self.activation.eval(z))
        .collect();
    }
    let y = self.output.apply(&h);
    [y[0], y[1]]
  }

  /// Forward pass carrying the tangent $dot(h) = dif h \/ dif x$ of every layer.
  pub fn trace(&self, x: f64) -> Trace {
    let mut hidden = Vec::with_capacity(self.hidden.len());
    let mut h = na::DVector::from_element(1, x);
    let mut hdot = na::DVector::from_element(1, 1.0);
    for layer in &self.hidden {
      let z = &layer.weights * &h + &layer.biases;
      let zdot = &layer.weights * &hdot;
      let mut hnew = na::DVector::zeros(z.len());
      let mut hdotnew = na::DVector::zeros(z.len());
      for i in 0..z.len() {
        let [s, ds, _] = self.activation.derivatives(z[i]);
        hnew[i] = s;
        hdotnew[i] = ds * zdot[i];
      }
      h = hnew.clone();
      hdot = hdotnew.clone();
      hidden.push([z, zdot, hnew, hdotnew]);
    }
    let y = &self.output.weights * &h + &self.output.biases;
    let ydot = &self.output.weights * &hdot;
    Trace {
      input: x,
      hidden,
      value: Complex64::new(y[0], y[1]),
      derivative: Complex64::new(ydot[0], ydot[1]),
    }
  }

  /// Zero gradient, shaped like [`Self::layers`].
  pub fn zero_gradient(&self) -> Vec<Layer> {
    self.layers().map(|l| Layer::zeros(l.nout(), l.nin())).collect()
  }

  /// Accumulates into `grad` the parameter gradient of a scalar depending on $u(x)$ and $u'(x)$,
  /// given its partial derivatives `adj_value` and `adj_derivative` with respect to the real
  /// and imaginary parts of $u(x)$ and $u'(x)$.
  pub fn backprop(
    &self,
    trace: &Trace,
    adj_value: [f64; 2],
    adj_derivative: [f64; 2],
    grad: &mut [Layer],
  ) {
    let nlayers = self.hidden.len() + 1;
    let output = &self.output;
    let ybar = na::DVector::from_column_slice(&adj_value);
    let ydotbar = na::DVector::from_column_slice(&adj_derivative);

    let input_h = na::DVector::from_element(1, trace.input);
    let input_hdot = na::DVector::from_element(1, 1.0);
    let prev = |ilayer: usize| match ilayer {
      0 => (&input_h, &input_hdot),
      _ => (&trace.hidden[ilayer - 1][2], &trace.hidden[ilayer - 1][3]),
    };

    let (h, hdot) = prev(nlayers - 1);
    grad[nlayers - 1].weights += &ybar * h.transpose() + &ydotbar * hdot.transpose();
    grad[nlayers - 1].biases += &ybar;
    let mut hbar = output.weights.tr_mul(&ybar);
    let mut hdotbar = output.weights.tr_mul(&ydotbar);

    for ilayer in (0..nlayers - 1).rev() {
      let [z, zdot, _, _] = &trace.hidden[ilayer];
      let mut zbar = na::DVector::zeros(z.len());
      let mut zdotbar = na::DVector::zeros(z.len());
      for i in 0..z.len() {
        let [_, ds, dds] = self.activation.derivatives(z[i]);
        zbar[i] = ds * hbar[i] + dds * zdot[i] * hdotbar[i];
        zdotbar[i] = ds * hdotbar[i];
      }
      let (h, hdot) = prev(ilayer);
      grad[ilayer].weights += &zbar * h.transpose() + &zdotbar * hdot.transpose();
      grad[ilayer].biases += &zbar;
      let weights = &self.hidden[ilayer].weights;
      hbar = weights.tr_mul(&zbar);
      hdotbar = weights.tr_mul(&zdotbar);
    }
  }
}

/// Concatenation of the weights and biases of `layers`, in parameter order.
pub fn flatten<'a>(layers: impl IntoIterator<Item = &'a Layer>) -> na::DVector<f64> {
  let values: Vec<f64> = layers
    .into_iter()
    .flat_map(|l| l.weights.iter().chain(l.biases.iter()).copied())
    .collect();
  na::DVector::from_vec(values)
}

pub fn add_gradients(mut a: Vec<Layer>, b: Vec<Layer>) -> Vec<Layer> {
  for (la, lb) in a.iter_mut().zip(b) {
    la.weights += lb.weights;
    la.biases += lb.biases;
  }
  a
}

impl Basis for Network {
  fn evaluate(&self, x: f64) -> Complex64 {
    let [re, im] = self.forward(x);
    Complex64::new(re, im)
  }

  fn derivative(&self, x: f64) -> Complex64 {
    match self.derivative {
      SpatialDerivative::Tangent => self.trace(x).derivative,
      SpatialDerivative::Dual => {
        let [re, im] = self.forward(Dual64::new(x, 1.0));
        Complex64::new(re.eps, im.eps)
      }
      SpatialDerivative::FiniteDifference { step } => {
        (self.evaluate(x + step) - self.evaluate(x - step)) / (2.0 * step)
      }
    }
  }
}
