use rand::Rng;

/// Tile value and probability of every outcome when nature places a tile.
pub const SPAWN_OUTCOMES: [(u32, f64); 2] = [(2, 0.9), (4, 0.1)];

/// Number of tiles placed on an empty board at game start.
pub const INITIAL_TILES: usize = 2;

/// Draws a spawn value following [`SPAWN_OUTCOMES`].
pub fn sample_spawn_value<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let roll: f64 = rng.r#gen();
    let mut cumulative = 0.0;
    for (value, probability) in SPAWN_OUTCOMES {
        cumulative += probability;
        if roll < cumulative {
            return value;
        }
    }
    SPAWN_OUTCOMES[SPAWN_OUTCOMES.len() - 1].0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn outcome_probabilities_sum_to_one() {
        let total: f64 = SPAWN_OUTCOMES.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sampled_values_follow_distribution() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut fours = 0usize;
        let draws = 10_000;
        for _ in 0..draws {
            match sample_spawn_value(&mut rng) {
                2 => {}
                4 => fours += 1,
                other => panic!("unexpected spawn value {other}"),
            }
        }
        let ratio = fours as f64 / draws as f64;
        assert!((0.07..0.13).contains(&ratio), "four ratio {ratio}");
    }
}
