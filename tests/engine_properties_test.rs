use proptest::prelude::*;
use std::sync::Arc;
use trove_engine::collaborators::{Hints, InMemoryProtocol, ManualClock, PriceVector, TroveLedger};
use trove_engine::domain::{Address, AssetId, CollateralRegistry, TimeMs, Wad};
use trove_engine::engine::ratio::nominal_cr;
use trove_engine::engine::{
    BorrowerOperations, Delta, EngineError, OpenTroveRequest, OperationReceipt, ProtocolParams,
    ProtocolSetup, SystemMode, SystemSnapshot,
};

const OWNERS: [&str; 4] = ["t0", "t1", "t2", "t3"];

#[derive(Debug, Clone)]
enum Op {
    Open { who: usize, coll: u64, debt: u64 },
    AddCollateral { who: usize, amount: u64 },
    WithdrawCollateral { who: usize, hundredths: u64 },
    WithdrawDebt { who: usize, amount: u64 },
    RepayDebt { who: usize, amount: u64 },
    Close { who: usize },
    SetPrice { price: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..OWNERS.len(), 1u64..=20, 1_800u64..=4_800)
            .prop_map(|(who, coll, debt)| Op::Open { who, coll, debt }),
        (0..OWNERS.len(), 1u64..=5).prop_map(|(who, amount)| Op::AddCollateral { who, amount }),
        (0..OWNERS.len(), 1u64..=150)
            .prop_map(|(who, hundredths)| Op::WithdrawCollateral { who, hundredths }),
        (0..OWNERS.len(), 1u64..=600).prop_map(|(who, amount)| Op::WithdrawDebt { who, amount }),
        (0..OWNERS.len(), 1u64..=300).prop_map(|(who, amount)| Op::RepayDebt { who, amount }),
        (0..OWNERS.len()).prop_map(|who| Op::Close { who }),
        (800u64..=3_000).prop_map(|price| Op::SetPrice { price }),
    ]
}

fn setup() -> (BorrowerOperations, InMemoryProtocol) {
    let registry = CollateralRegistry::native_only("ETH");
    let setup = ProtocolSetup::builder(registry.clone())
        .gas_pool(Address::new("gas-pool"))
        .fee_sink(Address::new("fee-sink"))
        .backstop_pool(Address::new("backstop"))
        .seal()
        .unwrap();
    let mut protocol =
        InMemoryProtocol::new(&registry, Arc::new(ManualClock::new(TimeMs::new(0))));
    protocol.prices.set_price(AssetId::NATIVE, Wad::from_units(2_000));
    (BorrowerOperations::new(Arc::new(setup)), protocol)
}

fn apply(
    ops: &BorrowerOperations,
    protocol: &mut InMemoryProtocol,
    op: &Op,
) -> Option<Result<OperationReceipt, EngineError>> {
    if let Op::SetPrice { price } = *op {
        protocol
            .prices
            .set_price(AssetId::NATIVE, Wad::from_units(price));
        return None;
    }

    let c = &mut protocol.collaborators();
    let max_fee = Wad::from_ratio(5, 100);
    let result = match *op {
        Op::Open { who, coll, debt } => {
            let req = OpenTroveRequest {
                asset: 0,
                coll: Wad::from_units(coll),
                debt: Wad::from_units(debt),
                max_fee_percentage: max_fee,
                hints: Hints::none(),
            };
            ops.open_trove(c, &Address::new(OWNERS[who]), &req)
        }
        Op::AddCollateral { who, amount } => ops.add_collateral(
            c,
            &Address::new(OWNERS[who]),
            Wad::from_units(amount),
            Hints::none(),
        ),
        Op::WithdrawCollateral { who, hundredths } => ops.withdraw_collateral(
            c,
            &Address::new(OWNERS[who]),
            Wad::from_ratio(hundredths, 100),
            Hints::none(),
        ),
        Op::WithdrawDebt { who, amount } => ops.withdraw_debt(
            c,
            &Address::new(OWNERS[who]),
            Wad::from_units(amount),
            max_fee,
            Hints::none(),
        ),
        Op::RepayDebt { who, amount } => ops.repay_debt(
            c,
            &Address::new(OWNERS[who]),
            Wad::from_units(amount),
            Hints::none(),
        ),
        Op::Close { who } => ops.close_trove(c, &Address::new(OWNERS[who])),
        Op::SetPrice { .. } => unreachable!(),
    };
    Some(result)
}

fn owner_of(op: &Op) -> Option<Address> {
    match *op {
        Op::Open { who, .. }
        | Op::AddCollateral { who, .. }
        | Op::WithdrawCollateral { who, .. }
        | Op::WithdrawDebt { who, .. }
        | Op::RepayDebt { who, .. }
        | Op::Close { who } => Some(Address::new(OWNERS[who])),
        Op::SetPrice { .. } => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_operations_preserve_engine_invariants(
        ops_seq in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let (ops, mut protocol) = setup();
        let params = ProtocolParams::default();
        let floor_debt = params.min_net_debt + params.gas_compensation;

        for op in &ops_seq {
            let mode = ops.system_status(&protocol.collaborators()).unwrap().mode;
            let before = owner_of(op)
                .map(|owner| ops.trove_view(&protocol.collaborators(), &owner).unwrap());

            let Some(result) = apply(&ops, &mut protocol, op) else {
                continue;
            };
            let Ok(receipt) = result else {
                continue;
            };

            match op {
                Op::Open { .. } => {
                    let required = if mode.is_recovery() { params.ccr } else { params.mcr };
                    prop_assert!(receipt.icr >= required);
                    prop_assert!(receipt.debt >= floor_debt);
                }
                Op::Close { .. } => {}
                _ => {
                    prop_assert!(receipt.debt >= floor_debt);
                    if mode == SystemMode::Recovery {
                        let old_icr = before.as_ref().map(|v| v.icr).unwrap();
                        prop_assert!(receipt.icr >= old_icr, "ICR fell in Recovery Mode: {:?}", op);
                    }
                }
            }

            prop_assert!(protocol.sorted.is_ordered());
            prop_assert_eq!(protocol.sorted.len(), protocol.troves.owners().len());
            for owner in protocol.troves.owners() {
                let coll = protocol.troves.collateral(owner);
                let debt = protocol.troves.debt(owner);
                prop_assert!(debt >= floor_debt);
                prop_assert_eq!(protocol.sorted.key_of(owner), Some(nominal_cr(coll, debt)));
            }
        }
    }

    #[test]
    fn prop_tcr_with_matches_resummed_totals(
        coll_eth in 0u64..=1_000,
        coll_btc in 0u64..=100,
        price_eth in 1u64..=10_000,
        price_btc in 1u64..=100_000,
        debt in 1u64..=10_000_000,
        coll_change in 0u64..=50,
        debt_change in 0u64..=100_000,
        use_btc in any::<bool>(),
        coll_up in any::<bool>(),
        debt_up in any::<bool>(),
    ) {
        let prices = PriceVector::new(vec![Wad::from_units(price_eth), Wad::from_units(price_btc)]);
        let collateral = vec![Wad::from_units(coll_eth), Wad::from_units(coll_btc)];
        let snapshot = SystemSnapshot::from_parts(prices.clone(), collateral.clone(), Wad::from_units(debt));

        let registry = CollateralRegistry::new(["ETH", "WBTC"]).unwrap();
        let asset = registry.resolve(u8::from(use_btc)).unwrap();
        let coll_delta = Delta::new(Wad::from_units(coll_change), coll_up);
        let debt_delta = Delta::new(Wad::from_units(debt_change), debt_up);

        let mut moved = collateral;
        let new_coll = coll_delta.apply(moved[asset.index()]);
        let new_debt = debt_delta.apply(Wad::from_units(debt));
        match (new_coll, new_debt) {
            (Some(new_coll), Some(new_debt)) => {
                moved[asset.index()] = new_coll;
                let resummed = SystemSnapshot::from_parts(prices, moved, new_debt).tcr();
                prop_assert_eq!(snapshot.tcr_with(asset, coll_delta, debt_delta), Ok(resummed));
            }
            _ => {
                prop_assert_eq!(
                    snapshot.tcr_with(asset, coll_delta, debt_delta),
                    Err(EngineError::AmountOverflow)
                );
            }
        }
    }
}
