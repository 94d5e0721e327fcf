use anyhow::Result;
use cogex_design::{DesignError, OrderGenerator, OrderType, StimulusOrder, blocked_order, order};

const PROBS: [f64; 4] = [0.25, 0.25, 0.25, 0.25];

#[test]
fn all_schemes_return_valid_labels() -> Result<()> {
    for ordertype in [OrderType::Random, OrderType::Blocked] {
        for seed in 0..25 {
            let order = order(4, 73, &PROBS, ordertype, seed)?;
            assert_eq!(order.len(), 73);
            assert!(order.as_slice().iter().all(|&l| l < 4), "{ordertype}: {order:?}");
        }
    }
    Ok(())
}

#[test]
fn blocked_order_decomposes_into_equal_blocks() -> Result<()> {
    for seed in 0..25 {
        let (blocked, block) = blocked_order(60, &PROBS, seed)?;
        assert_eq!(blocked, order(4, 60, &PROBS, OrderType::Blocked, seed)?);
        assert!((1..=9).contains(&block));

        // Label changes only happen on block boundaries.
        let labels = blocked.as_slice();
        for i in 1..labels.len() {
            if labels[i] != labels[i - 1] {
                assert_eq!(i % block, 0, "seed {seed}: switch at {i}, block {block}");
            }
        }
    }
    Ok(())
}

#[test]
fn order_type_names_parse() -> Result<()> {
    let ordertype: OrderType = "blocked".parse()?;
    let a = order(4, 20, &PROBS, ordertype, 5)?;
    let b = order(4, 20, &PROBS, OrderType::Blocked, 5)?;
    assert_eq!(a, b);

    let err = "latin".parse::<OrderType>().unwrap_err();
    assert!(matches!(err, DesignError::InvalidArgument(ref m) if m.contains("latin")));
    Ok(())
}

#[test]
fn msequence_candidates_come_from_provider() -> Result<()> {
    let generator = OrderGenerator::new().with_msequence(
        |length: usize, alphabet: usize, _seed: u64| -> cogex_design::Result<Vec<Vec<usize>>> {
            Ok((0..alphabet)
                .map(|shift| (0..length).map(|i| (i + shift) % alphabet).collect())
                .collect())
        },
    );
    let picked: StimulusOrder = generator.order(3, 12, &[0.2, 0.3, 0.5], OrderType::Msequence, 1234)?;
    assert_eq!(picked.len(), 12);
    assert_eq!(picked.counts(3), vec![4, 4, 4]);
    Ok(())
}

#[test]
fn provider_errors_propagate() {
    let generator = OrderGenerator::new().with_msequence(
        |_: usize, _: usize, _: u64| -> cogex_design::Result<Vec<Vec<usize>>> { Ok(Vec::new()) },
    );
    let err = generator
        .order(2, 8, &[0.5, 0.5], OrderType::Msequence, 1)
        .unwrap_err();
    assert!(matches!(err, DesignError::InvalidArgument(_)));
}
