use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rts_site_planner::box_cache::naive_sum_map;
use rts_site_planner::choke::ChokeWeightGrid;
use rts_site_planner::geometry::GridGeometry;
use rts_site_planner::grid::GridArray;
use rts_site_planner::*;

fn choke_grid(width: u32, height: u32, box_size: u32) -> ChokeWeightGrid {
    let geometry = GridGeometry::new(width, height, 8).expect("valid geometry");
    ChokeWeightGrid::new(&geometry, box_size, 1).expect("valid box size")
}

fn random_pos(rng: &mut ChaCha8Rng, width: u32, height: u32) -> WorldPos {
    // Slightly off the map now and then to exercise clamping.
    WorldPos::new(
        rng.gen_range(-20.0..width as f32 + 20.0),
        rng.gen_range(-20.0..height as f32 + 20.0),
    )
}

#[test]
fn cached_sums_track_random_edits() {
    for seed in 0..8u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (width, height) = (rng.gen_range(80..400), rng.gen_range(80..400));
        let box_size = rng.gen_range(1..10);
        let mut choke = choke_grid(width, height, box_size);
        let geometry = *choke.geometry();
        let mut placed: Vec<(WorldPos, i32)> = Vec::new();

        for step in 0..120 {
            match rng.gen_range(0..6) {
                0 | 1 => {
                    let pos = random_pos(&mut rng, width, height);
                    let radius = rng.gen_range(-1..8);
                    choke.apply_defense_placed(pos, radius);
                    placed.push((pos, radius));
                }
                2 if !placed.is_empty() => {
                    let index = rng.gen_range(0..placed.len());
                    let (pos, radius) = placed.swap_remove(index);
                    choke.apply_defense_removed(pos, radius);
                }
                3 => {
                    choke.set_radius(rng.gen_range(0..9));
                }
                4 => {
                    let x = rng.gen_range(0..geometry.width());
                    let y = rng.gen_range(0..geometry.height());
                    let cell = Cell::from_coords(x, y);
                    let expected = *naive_sum_map(choke.weights(), choke.radius()).at(cell);
                    assert_eq!(
                        choke.sum_at(cell),
                        expected,
                        "seed {seed} step {step}: sum at {:?}",
                        cell
                    );
                }
                _ => {
                    let expected = naive_sum_map(choke.weights(), choke.radius());
                    assert_eq!(
                        choke.sum_map(),
                        &expected,
                        "seed {seed} step {step}: full sum map diverged"
                    );
                }
            }
        }

        let expected = naive_sum_map(choke.weights(), choke.radius());
        assert_eq!(choke.sum_map(), &expected, "seed {seed}: final sum map");
    }
}

#[test]
fn sums_are_within_tolerance_of_f64_reference() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut choke = choke_grid(240, 200, 7);
    let geometry = *choke.geometry();
    let mut weights = geometry.new_array(0.0f32);
    for y in 0..geometry.height() as usize {
        for x in 0..geometry.width() as usize {
            weights.set(x, y, rng.gen_range(0.0..3.0));
        }
    }
    choke.replace_weights(weights.clone());

    for radius in [1u32, 4, 9] {
        choke.set_radius(radius);
        let sums = choke.sum_map().clone();
        for y in 0..geometry.height() as i64 {
            for x in 0..geometry.width() as i64 {
                let r = radius as i64;
                let mut reference = 0.0f64;
                for dy in -r..=r {
                    for dx in -r..=r {
                        if dx * dx + dy * dy <= r * r && weights.contains(x + dx, y + dy) {
                            reference += *weights.get((x + dx) as usize, (y + dy) as usize) as f64;
                        }
                    }
                }
                let cached = *sums.get(x as usize, y as usize) as f64;
                assert!(
                    (cached - reference).abs() <= 1e-3 * reference.max(1.0),
                    "radius {radius} cell ({x}, {y}): cached {cached} reference {reference}"
                );
            }
        }
    }
}

#[test]
fn best_spot_matches_naive_maximum() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut choke = choke_grid(320, 256, 5);
    for _ in 0..30 {
        let pos = random_pos(&mut rng, 320, 256);
        choke.apply_defense_placed(pos, rng.gen_range(1..6));
    }
    choke.set_radius(3);

    let naive = naive_sum_map(choke.weights(), 3);
    let naive_max = naive
        .as_slice()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let (cell, value) = choke.best_spot().expect("non-empty grid");
    assert_eq!(value, naive_max);
    assert_eq!(*naive.at(cell), naive_max);
}

#[test]
fn defense_toggling_is_idempotent() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut choke = choke_grid(256, 256, 8);
    choke.set_radius(4);
    let before_weights = choke.weights().clone();
    let before_sums = choke.sum_map().clone();

    let edits: Vec<(WorldPos, i32)> = (0..25)
        .map(|_| (random_pos(&mut rng, 256, 256), rng.gen_range(0..7)))
        .collect();
    for (pos, radius) in &edits {
        choke.apply_defense_placed(*pos, *radius);
    }
    // Remove in a different order than they were placed.
    for (pos, radius) in edits.iter().rev() {
        choke.apply_defense_removed(*pos, *radius);
    }

    assert_eq!(choke.weights(), &before_weights);
    assert_eq!(choke.sum_map(), &before_sums);
}

#[test]
fn weights_never_go_negative() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut choke = choke_grid(128, 128, 4);
    for _ in 0..200 {
        let pos = random_pos(&mut rng, 128, 128);
        if rng.gen_bool(0.5) {
            choke.apply_defense_placed(pos, rng.gen_range(1..5));
        } else {
            choke.apply_defense_removed(pos, rng.gen_range(1..5));
        }
    }
    assert!(choke.weights().as_slice().iter().all(|w| *w >= 0.0));

    let mut negative = GridArray::new(16, 16, -1.0f32);
    negative.set(3, 3, 2.0);
    choke.replace_weights(negative);
    assert!(choke.weights().as_slice().iter().all(|w| *w >= 0.0));
}

#[test]
fn uniform_weights_give_disk_area() {
    let mut choke = choke_grid(256, 256, 8);
    choke.set_radius(2);
    assert_eq!(choke.sum_at(Cell::new(16, 16)), 13.0);
}
