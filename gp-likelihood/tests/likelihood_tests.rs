use approx::assert_abs_diff_eq;
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::Optimizer;
use gp_likelihood::distributions::GaussianDistribution;
use gp_likelihood::integrators::GHQuadratureIntegrator;
use gp_likelihood::likelihood::{
    expected_log_likelihood, Bernoulli, Gaussian, Likelihood, LikelihoodFunction, Poisson,
};
use gp_likelihood::parameters::{Parameter, PositiveReal, Static};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// E_{f ~ N(m, v)}[log p(y | f)] by trapezoid on a fine grid, using the
/// likelihood's own link function
fn fine_grid_reference(lik: &Likelihood, y: f64, m: f64, v: f64) -> anyhow::Result<f64> {
    let device = Device::Cpu;
    let sd = v.sqrt();
    let npts = 20_001;
    let (lo, hi) = (m - 12.0 * sd, m + 12.0 * sd);
    let h = (hi - lo) / (npts - 1) as f64;

    let grid: Vec<f64> = (0..npts).map(|i| lo + h * i as f64).collect();
    let f = Tensor::from_vec(grid.clone(), npts, &device)?;
    let yy = Tensor::full(y, npts, &device)?;
    let log_prob: Vec<f64> = lik.link_function(&f)?.log_prob(&yy)?.to_vec1()?;

    let norm = 1.0 / (2.0 * std::f64::consts::PI * v).sqrt();
    let mut total = 0.0;
    for (i, (x, lp)) in grid.iter().zip(log_prob.iter()).enumerate() {
        let dens = norm * (-(x - m).powi(2) / (2.0 * v)).exp();
        let w = if i == 0 || i == npts - 1 { 0.5 } else { 1.0 };
        total += w * lp * dens;
    }
    Ok(total * h)
}

fn scalar_ell(lik: &Likelihood, y: f64, m: f64, v: f64) -> anyhow::Result<f64> {
    let device = Device::Cpu;
    let y = Tensor::new(&[[y]], &device)?;
    let m = Tensor::new(&[[m]], &device)?;
    let v = Tensor::new(&[[v]], &device)?;
    Ok(lik.expected_log_likelihood(&y, &m, &v)?.to_vec1::<f64>()?[0])
}

#[test]
fn gaussian_expected_log_likelihood_reference_value() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let lik = Likelihood::from(Gaussian::new(1, 1.0, &device)?);

    let got = scalar_ell(&lik, 1.0, 0.0, 1.0)?;
    // -0.5 ln(2π) - ln(1) - (1 + 1) / 2
    let want = -0.5 * (2.0 * std::f64::consts::PI).ln() - 1.0;
    assert_abs_diff_eq!(got, want, epsilon = 1e-12);
    Ok(())
}

#[test]
fn quadrature_converges_for_bernoulli() -> anyhow::Result<()> {
    for (y, m, v) in [(1.0, 0.5, 1.0), (0.0, -1.0, 0.3), (1.0, -2.0, 2.5)] {
        let reference = fine_grid_reference(&Likelihood::from(Bernoulli::new(1)), y, m, v)?;

        let err = |k: usize| -> anyhow::Result<f64> {
            let lik = Likelihood::from(Bernoulli::with_integrator(
                1,
                GHQuadratureIntegrator::new(k),
            ));
            Ok((scalar_ell(&lik, y, m, v)? - reference).abs())
        };

        let (e2, e20, e50) = (err(2)?, err(20)?, err(50)?);
        assert!(e20 < 1e-2, "20 points: {}", e20);
        assert!(e50 < 2e-4, "50 points: {}", e50);
        assert!(e50 <= e2, "{} vs {}", e50, e2);
    }
    Ok(())
}

#[test]
fn quadrature_converges_for_poisson() -> anyhow::Result<()> {
    for (y, m, v) in [(3.0, 0.3, 0.8), (0.0, -0.5, 0.2), (12.0, 2.0, 1.5)] {
        let reference = fine_grid_reference(&Likelihood::from(Poisson::new(1)), y, m, v)?;

        let err = |k: usize| -> anyhow::Result<f64> {
            let lik = Likelihood::from(Poisson::with_integrator(1, GHQuadratureIntegrator::new(k)));
            Ok((scalar_ell(&lik, y, m, v)? - reference).abs())
        };

        let (e2, e5, e20) = (err(2)?, err(5)?, err(20)?);
        assert!(e20 < 1e-7, "20 points: {}", e20);
        assert!(e20 < e5 && e5 < e2, "{} {} {}", e2, e5, e20);
    }
    Ok(())
}

#[test]
fn bernoulli_quadrature_matches_monte_carlo() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let (y, m, v) = (1.0, 0.4, 1.3);
    let lik = Likelihood::from(Bernoulli::new(1));

    let mut rng = StdRng::seed_from_u64(42);
    let normal = Normal::new(m, f64::sqrt(v)).unwrap();
    let draws: Vec<f64> = (0..200_000).map(|_| normal.sample(&mut rng)).collect();
    let n = draws.len();

    let f = Tensor::from_vec(draws, n, &device)?;
    let yy = Tensor::full(y, n, &device)?;
    let mc: f64 = lik.link_function(&f)?.log_prob(&yy)?.mean_all()?.to_scalar()?;

    let quad = scalar_ell(&lik, y, m, v)?;
    assert_abs_diff_eq!(quad, mc, epsilon = 2e-2);
    Ok(())
}

#[test]
fn predictive_ignores_off_diagonal_covariance() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let mean = Tensor::new(&[0.3f64, -1.2, 2.0], &device)?;
    let diag = Tensor::new(&[[0.5f64, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]], &device)?;
    let full = Tensor::new(&[[0.5f64, 0.4, -0.3], [0.4, 1.0, 0.2], [-0.3, 0.2, 2.0]], &device)?;

    let q_diag = GaussianDistribution::new(mean.clone(), diag)?;
    let q_full = GaussianDistribution::new(mean, full)?;

    for lik in [Likelihood::from(Bernoulli::new(3)), Likelihood::from(Poisson::new(3))] {
        let a: Vec<f64> = lik.predict(&q_diag)?.mean()?.to_vec1()?;
        let b: Vec<f64> = lik.predict(&q_full)?.mean()?.to_vec1()?;
        assert_eq!(a, b, "{}", lik.name());
    }
    Ok(())
}

#[test]
fn gradients_reach_variational_and_noise_parameters() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let lik = Likelihood::from(Gaussian::new(3, 0.7, &device)?);

    let y = Tensor::new(&[[0.5f64], [-1.0], [2.0]], &device)?;
    let mean = Var::from_tensor(&Tensor::new(&[[0.0f64], [0.5], [1.0]], &device)?)?;
    let variance = Var::from_tensor(&Tensor::new(&[[0.2f64], [0.4], [1.0]], &device)?)?;

    let total = lik
        .expected_log_likelihood(&y, mean.as_tensor(), variance.as_tensor())?
        .sum_all()?;
    let grads = total.backward()?;

    let sigma: f64 = match &lik {
        Likelihood::Gaussian(g) => g.obs_stddev().value()?.to_scalar()?,
        _ => unreachable!(),
    };
    let s2 = sigma * sigma;

    let g_mean: Vec<f64> = grads.get(mean.as_tensor()).unwrap().flatten_all()?.to_vec1()?;
    let g_var: Vec<f64> = grads.get(variance.as_tensor()).unwrap().flatten_all()?.to_vec1()?;
    let ys = [0.5, -1.0, 2.0];
    let ms = [0.0, 0.5, 1.0];
    let vs = [0.2, 0.4, 1.0];
    for i in 0..3 {
        assert_abs_diff_eq!(g_mean[i], (ys[i] - ms[i]) / s2, epsilon = 1e-10);
        assert_abs_diff_eq!(g_var[i], -0.5 / s2, epsilon = 1e-10);
    }

    // dσ/du = sigmoid(u) = 1 - exp(-σ) for σ = softplus(u)
    let vars = lik.trainable_vars();
    assert_eq!(vars.len(), 1);
    let g_raw: f64 = grads.get(vars[0].as_tensor()).unwrap().to_scalar()?;
    let d_sigma: f64 = (0..3)
        .map(|i| -1.0 / sigma + ((ys[i] - ms[i]).powi(2) + vs[i]) / (s2 * sigma))
        .sum();
    assert_abs_diff_eq!(g_raw, d_sigma * (1.0 - (-sigma).exp()), epsilon = 1e-9);
    Ok(())
}

#[test]
fn gradients_flow_through_quadrature() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let y = Tensor::new(&[[1.0f64], [0.0]], &device)?;
    let mean = Var::from_tensor(&Tensor::new(&[[0.2f64], [0.1]], &device)?)?;
    let variance = Var::from_tensor(&Tensor::new(&[[0.5f64], [0.5]], &device)?)?;

    for lik in [Likelihood::from(Bernoulli::new(2)), Likelihood::from(Poisson::new(2))] {
        let total = expected_log_likelihood(&lik, &y, mean.as_tensor(), variance.as_tensor())?
            .sum_all()?;
        let grads = total.backward()?;
        let g: Vec<f64> = grads.get(mean.as_tensor()).unwrap().flatten_all()?.to_vec1()?;
        assert!(g.iter().all(|x| x.is_finite() && x.abs() > 1e-6), "{}: {:?}", lik.name(), g);
    }
    Ok(())
}

#[test]
fn optimizer_recovers_noise_scale() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let lik = Likelihood::from(Gaussian::new(4, 0.5, &device)?);

    let y = Tensor::new(&[[1.0f64], [-1.0], [2.0], [0.0]], &device)?;
    let m = Tensor::zeros((4, 1), DType::F64, &device)?;
    let v = Tensor::full(0.5f64, (4, 1), &device)?;

    let mut sgd = candle_nn::SGD::new(lik.trainable_vars(), 0.1)?;
    for _ in 0..500 {
        let loss = lik.expected_log_likelihood(&y, &m, &v)?.mean_all()?.neg()?;
        sgd.backward_step(&loss)?;
    }

    // σ² = mean((y - m)² + v) = 2
    let sigma: f64 = match &lik {
        Likelihood::Gaussian(g) => g.obs_stddev().value()?.to_scalar()?,
        _ => unreachable!(),
    };
    assert_abs_diff_eq!(sigma, 2f64.sqrt(), epsilon = 1e-6);
    Ok(())
}

#[test]
fn static_noise_is_not_trained() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let fixed = Parameter::from(Static::from_f64(0.9, &device)?);
    let lik = Likelihood::from(Gaussian::with_parameter(2, fixed));
    assert!(lik.trainable_vars().is_empty());

    let learned = Parameter::from(PositiveReal::from_f64(0.9, &device)?);
    let lik = Likelihood::from(Gaussian::with_parameter(2, learned));
    assert_eq!(lik.trainable_vars().len(), 1);
    Ok(())
}

#[test]
fn likelihood_is_shared_across_threads() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let lik = Likelihood::from(Poisson::new(2));
    let y = Tensor::new(&[[1.0f64], [4.0]], &device)?;
    let m = Tensor::new(&[[0.0f64], [1.2]], &device)?;
    let v = Tensor::new(&[[0.3f64], [0.1]], &device)?;

    let serial: Vec<f64> = lik.expected_log_likelihood(&y, &m, &v)?.to_vec1()?;

    let results: Vec<Vec<f64>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| -> candle_core::Result<Vec<f64>> {
                    lik.expected_log_likelihood(&y, &m, &v)?.to_vec1()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect::<candle_core::Result<_>>()
    })?;

    for r in results {
        assert_eq!(r, serial);
    }
    Ok(())
}
