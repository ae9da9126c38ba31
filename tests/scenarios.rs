use autosim::{
    parse, sample, Automaton, EngineConfig, ExecutionData, Formalism, NodeKind, Status,
};

fn load(name: &str) -> Automaton {
    sample(name)
        .unwrap()
        .load(&EngineConfig::default())
        .unwrap()
}

fn accepts(automaton: &Automaton, input: &str) -> bool {
    automaton.accepts(input, &EngineConfig::default()).unwrap()
}

#[test]
fn dfa_rejects_strings_ending_in_triple_zero() {
    let dfa = load("no-triple-zero");

    assert!(!accepts(&dfa, "000"));
    assert!(accepts(&dfa, "0001"));
    assert!(accepts(&dfa, ""));
    assert!(!accepts(&dfa, "11000"));

    let Automaton::Dfa(dfa) = dfa else {
        panic!("expected a DFA");
    };
    let trace = dfa.states_visited("0001").unwrap();
    assert_eq!(
        trace.states,
        ["q", "q0", "q00", "q000", "q"].map(|s| Some(s.to_string()))
    );
    assert!(dfa.accepts("1").is_ok());
    assert!(dfa.accepts("012").is_err());
}

#[test]
fn dfa_minimization_keeps_the_language() {
    let Automaton::Dfa(dfa) = load("no-triple-zero") else {
        panic!("expected a DFA");
    };
    let minimal = dfa.minimize();

    assert_eq!(minimal.states().len(), 4);
    assert!(minimal.is_equivalent(&dfa));
    assert!(minimal.minimize().is_equivalent(&minimal));
}

#[test]
fn nfa_third_to_last_symbol_is_zero() {
    let nfa = load("third-to-last-zero");

    assert!(accepts(&nfa, "000"));
    assert!(accepts(&nfa, "1011"));
    assert!(!accepts(&nfa, "111"));
    assert!(!accepts(&nfa, "00"));

    let data = nfa.execute("011", &EngineConfig::default()).unwrap();
    let ExecutionData::Nfa(trace) = data else {
        panic!("expected an NFA trace");
    };
    assert_eq!(trace.state_sets.len(), 4);
    assert_eq!(trace.state_sets[3], ["s", "c"]);
    assert!(trace.accepted);
}

#[test]
fn nfa_subset_construction_agrees() {
    let Automaton::Nfa(nfa) = load("third-to-last-zero") else {
        panic!("expected an NFA");
    };
    let dfa = nfa.to_dfa();

    for input in ["", "0", "000", "0110", "1101", "10011", "0100"] {
        assert_eq!(
            dfa.accepts(input).unwrap(),
            nfa.accepts(input).unwrap(),
            "{input:?}"
        );
    }
    assert_eq!(dfa.minimize().states().len(), 8);
}

#[test]
fn regex_contains_010() {
    let regex = load("contains-010");

    assert!(accepts(&regex, "010"));
    assert!(!accepts(&regex, "001"));

    for length in 0..=6u32 {
        for bits in 0..(1u32 << length) {
            let input: String = (0..length)
                .rev()
                .map(|i| if bits >> i & 1 == 1 { '1' } else { '0' })
                .collect();
            assert_eq!(accepts(&regex, &input), input.contains("010"), "{input:?}");
        }
    }
}

#[test]
fn regex_foreign_symbol_rejects() {
    let regex = load("contains-010");

    assert!(!accepts(&regex, "0102"));
}

#[test]
fn cfg_balanced_parentheses() {
    let Automaton::Cfg(grammar) = load("balanced-parens") else {
        panic!("expected a grammar");
    };

    let tree = grammar.parse_tree("(())").unwrap().unwrap();
    assert_eq!(tree.depth(), 3);
    assert_eq!(tree.yield_string(), "(())");
    assert_eq!(tree.kind, NodeKind::Nonterminal);

    assert!(grammar.parse_tree("(()").unwrap().is_none());
    assert!(grammar.accepts("").unwrap());
    assert!(grammar.accepts("()(())").unwrap());
    assert!(!grammar.accepts(")(").unwrap());

    let trace = grammar.trace("()").unwrap();
    assert_eq!(trace.derivation.first().map(String::as_str), Some("S"));
    assert_eq!(trace.derivation.last().map(String::as_str), Some("()"));
}

#[test]
fn tm_palindromes() {
    let tm = load("palindrome");

    assert!(accepts(&tm, ""));
    assert!(accepts(&tm, "010"));
    assert!(accepts(&tm, "0110"));
    assert!(!accepts(&tm, "011"));
}

#[test]
fn tm_stepping_backward_restores_initial_configuration() {
    let Automaton::Tm(tm) = load("palindrome") else {
        panic!("expected a Turing Machine");
    };
    let log = tm.run("0110", &EngineConfig::default()).unwrap();
    assert_eq!(log.outcome, Status::Accepted);

    let mut timeline = log.timeline();
    timeline.to_end();
    assert_eq!(timeline.current(), &log.final_config);
    while timeline.backward().unwrap() {}

    assert_eq!(timeline.position(), 0);
    assert_eq!(timeline.current(), &log.initial);

    while timeline.forward().unwrap() {}
    assert_eq!(timeline.current(), &log.final_config);
}

#[test]
fn tm_step_limit_is_an_outcome() {
    let looping = "\
states: [spin, yes, no]
input_alphabet: [a]
start_state: spin
accept_state: yes
reject_state: no
delta:
  spin:
    a: [spin, a, S]
";
    let tm = parse(Formalism::Tm, looping, &EngineConfig::default()).unwrap();
    let config = EngineConfig::default().with_max_steps(25);

    let ExecutionData::Tm(log) = tm.execute("a", &config).unwrap() else {
        panic!("expected an execution log");
    };
    assert_eq!(log.outcome, Status::StepLimitExceeded);
    assert_eq!(log.steps(), 25);
    assert!(!tm.accepts("a", &config).unwrap());
}

#[test]
fn execution_data_serializes_with_formalism_tag() {
    let dfa = load("no-triple-zero");
    let data = dfa.execute("01", &EngineConfig::default()).unwrap();
    let json = serde_json::to_value(&data).unwrap();

    assert_eq!(json["formalism"], "Dfa");
    assert_eq!(json["data"]["accepted"], true);
}
