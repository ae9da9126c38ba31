use autosim::dfa::DfaDefinition;
use autosim::grammar::GrammarDefinition;
use autosim::machine::{TmAction, TmDefinition};
use autosim::nfa::NfaDefinition;
use autosim::{Configuration, Dfa, Direction, EngineConfig, Nfa, TuringMachine};
use proptest::{collection, prelude::*};

fn state_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("s{i}")).collect()
}

/// A DFA over {a, b} with up to five states and a possibly partial transition table.
fn dfa_strategy() -> impl Strategy<Value = Dfa> {
    (1..=5usize).prop_flat_map(|count| {
        (
            collection::vec(any::<bool>(), count),
            collection::vec(proptest::option::of(0..count), count * 2),
        )
            .prop_map(move |(accepting, targets)| {
                let states = state_names(count);
                let delta = targets
                    .iter()
                    .enumerate()
                    .filter_map(|(index, target)| {
                        let symbol = if index % 2 == 0 { 'a' } else { 'b' };
                        target.map(|to| (states[index / 2].clone(), symbol, states[to].clone()))
                    })
                    .collect();
                DfaDefinition {
                    accept_states: states
                        .iter()
                        .zip(&accepting)
                        .filter(|(_, accept)| **accept)
                        .map(|(name, _)| name.clone())
                        .collect(),
                    start_state: states[0].clone(),
                    input_alphabet: vec!['a', 'b'],
                    states,
                    delta,
                }
                .build(false)
                .unwrap()
            })
    })
}

/// An NFA over {a, b} with up to four states, including ε-moves.
fn nfa_strategy() -> impl Strategy<Value = Nfa> {
    (1..=4usize).prop_flat_map(|count| {
        (
            collection::vec(any::<bool>(), count),
            collection::vec(
                (0..count, prop_oneof![Just(None), Just(Some('a')), Just(Some('b'))], 0..count),
                0..10,
            ),
        )
            .prop_map(move |(accepting, edges)| {
                let states = state_names(count);
                let mut delta: Vec<(String, Option<char>, Vec<String>)> = Vec::new();
                for (from, symbol, to) in edges {
                    let from = states[from].clone();
                    let to = states[to].clone();
                    match delta
                        .iter_mut()
                        .find(|(state, key, _)| *state == from && *key == symbol)
                    {
                        Some((_, _, targets)) if !targets.contains(&to) => targets.push(to),
                        Some(_) => {}
                        None => delta.push((from, symbol, vec![to])),
                    }
                }
                NfaDefinition {
                    accept_states: states
                        .iter()
                        .zip(&accepting)
                        .filter(|(_, accept)| **accept)
                        .map(|(name, _)| name.clone())
                        .collect(),
                    start_state: states[0].clone(),
                    input_alphabet: vec!['a', 'b'],
                    states,
                    delta,
                }
                .build()
                .unwrap()
            })
    })
}

/// A Turing Machine over {0, 1} with three working states and an arbitrary rule table.
fn tm_strategy() -> impl Strategy<Value = TuringMachine> {
    let rule = proptest::option::of((
        0..5usize,
        prop_oneof![Just('0'), Just('1'), Just('x'), Just('_')],
        prop_oneof![
            Just(Direction::Left),
            Just(Direction::Right),
            Just(Direction::Stay)
        ],
    ));

    collection::vec(rule, 12).prop_map(|rules| {
        let states: Vec<String> = ["w0", "w1", "w2", "yes", "no"].map(String::from).to_vec();
        let reads = ['0', '1', 'x', '_'];
        let delta = rules
            .into_iter()
            .enumerate()
            .filter_map(|(index, rule)| {
                rule.map(|(next, write, direction)| {
                    (
                        states[index / reads.len()].clone(),
                        reads[index % reads.len()],
                        TmAction {
                            next_state: states[next].clone(),
                            write,
                            direction,
                        },
                    )
                })
            })
            .collect();

        TmDefinition {
            states: states.clone(),
            input_alphabet: vec!['0', '1'],
            tape_alphabet_extra: vec!['x'],
            start_state: "w0".into(),
            accept_state: "yes".into(),
            reject_state: "no".into(),
            delta,
        }
        .build()
        .unwrap()
    })
}

fn is_balanced(input: &str) -> bool {
    let mut depth = 0i32;
    for c in input.chars() {
        depth += if c == '(' { 1 } else { -1 };
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

proptest! {
    #[test]
    fn dfa_acceptance_matches_last_visited_state(
        dfa in dfa_strategy(),
        input in "[ab]{0,8}",
    ) {
        let trace = dfa.states_visited(&input).unwrap();
        let last_accepts = trace
            .states
            .last()
            .cloned()
            .flatten()
            .is_some_and(|state| dfa.is_accept_state(&state));

        prop_assert_eq!(trace.states.len(), input.len() + 1);
        prop_assert_eq!(dfa.accepts(&input).unwrap(), last_accepts);
        prop_assert_eq!(trace.accepted, last_accepts);
    }

    #[test]
    fn minimization_preserves_language(
        dfa in dfa_strategy(),
        inputs in collection::vec("[ab]{0,8}", 10),
    ) {
        let minimal = dfa.minimize();
        let twice = minimal.minimize();

        prop_assert!(minimal.is_equivalent(&dfa));
        prop_assert_eq!(&twice, &minimal);
        prop_assert_eq!(twice.transitions(), minimal.transitions());
        prop_assert!(minimal.states().len() <= dfa.states().len());
        for input in &inputs {
            prop_assert_eq!(minimal.accepts(input).unwrap(), dfa.accepts(input).unwrap());
        }
    }

    #[test]
    fn nfa_acceptance_matches_last_state_set(
        nfa in nfa_strategy(),
        input in "[ab]{0,8}",
    ) {
        let trace = nfa.state_sets_visited(&input).unwrap();
        let accept_states = nfa.accept_states();
        let last_accepts = trace
            .state_sets
            .last()
            .is_some_and(|set| set.iter().any(|state| accept_states.contains(&state.as_str())));

        prop_assert_eq!(nfa.accepts(&input).unwrap(), last_accepts);
        prop_assert_eq!(trace.accepted, last_accepts);
        prop_assert_eq!(nfa.to_dfa().accepts(&input).unwrap(), last_accepts);
    }

    #[test]
    fn parse_tree_yields_the_input(input in "[()]{0,10}") {
        let grammar = GrammarDefinition {
            rules: vec![("S".into(), vec!["(S)".into(), "SS".into(), "".into()])],
        }
        .build()
        .unwrap();

        match grammar.parse_tree(&input).unwrap() {
            Some(tree) => {
                prop_assert!(is_balanced(&input));
                prop_assert_eq!(tree.yield_string(), input);
            }
            None => prop_assert!(!is_balanced(&input)),
        }
    }

    #[test]
    fn tm_diffs_are_reversible(tm in tm_strategy(), input in "[01]{0,6}") {
        let config = EngineConfig::default().with_max_steps(200);
        let log = tm.run(&input, &config).unwrap();

        let mut replay: Configuration = log.initial.clone();
        for diff in &log.diffs {
            let before = replay.clone();
            replay.apply_diff(diff).unwrap();
            let mut undone = replay.clone();
            undone.apply_reverse_diff(diff).unwrap();
            prop_assert_eq!(&undone, &before);
        }
        prop_assert_eq!(&replay, &log.final_config);

        let mut timeline = log.timeline();
        timeline.to_end();
        while timeline.backward().unwrap() {}
        prop_assert_eq!(timeline.current(), &log.initial);
    }
}
