use gpmc::{HmcParams, Inducings, Kernel, Poisson, Sgpmc, SquaredExponentialCorr};
use linfa::prelude::*;
use ndarray::{array, concatenate, Array, Axis};

fn main() {
    env_logger::init();

    // counts observed along [0, 1] with a rate exp(2 sin(2 pi x))
    let xt = Array::linspace(0., 1., 40).insert_axis(Axis(1));
    let yt = xt.mapv(|x: f64| (2. * (2. * std::f64::consts::PI * x).sin()).exp().round());

    println!("Build SGPMC model of counts at {}", xt.column(0));
    let kernel = Kernel::new(SquaredExponentialCorr(), array![5.], 2.).expect("kernel");
    let model = Sgpmc::params(kernel, Poisson::default(), Inducings::Randomized(10))
        .seed(Some(42))
        .fit(&Dataset::new(xt, yt))
        .expect("SGPMC model");

    let samples = model
        .sample(
            HmcParams::new()
                .n_samples(200)
                .n_burnin(100)
                .step_size(0.05)
                .n_leapfrog(20)
                .n_chains(2)
                .seed(Some(0)),
        )
        .expect("HMC sampling");
    println!(
        "{} samples drawn, acceptance rate {:.2}",
        samples.len(),
        samples.acceptance_rate()
    );

    let xtest = Array::linspace(0., 1., 11).insert_axis(Axis(1));
    let (fmean, fvar) = samples.predict_f(&model, &xtest).expect("prediction");

    println!("Latent log rate (x, mean, std)");
    println!(
        "{}",
        concatenate![Axis(1), xtest, fmean, fvar.mapv(|v| v.sqrt())]
    );
}
