use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::test_logger;

/// Runs the given test function `iterations` times with a seeded random number
/// generator. The seed is printed so that a failing run can be reproduced by
/// setting `PMC_SEED`.
pub fn random_test<F>(iterations: usize, test_function: F)
where
    F: FnMut(&mut StdRng),
{
    let seed = match std::env::var("PMC_SEED") {
        Ok(seed) => match seed.parse::<u64>() {
            Ok(seed) => {
                println!("seed: {seed} (fixed by PMC_SEED)");
                seed
            }
            Err(_) => panic!("PMC_SEED must be a valid u64, got {seed}"),
        },
        Err(_) => {
            let seed: u64 = rand::random();
            println!("random seed: {seed} (use PMC_SEED=<seed> to set a fixed seed)");
            seed
        }
    };

    random_test_seeded(seed, iterations, test_function);
}

/// Same as [random_test], but with an explicit seed.
pub fn random_test_seeded<F>(seed: u64, iterations: usize, mut test_function: F)
where
    F: FnMut(&mut StdRng),
{
    test_logger();

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..iterations {
        test_function(&mut rng);
    }
}
