use test_case::test_case;
use test_log::test;

use pmc_check::model_checking;
use pmc_model::Model;
use pmc_model::RANDOM_REWARD_MODEL;
use pmc_model::StateIndex;
use pmc_model::formula::Property;
use pmc_model::formula::StateFormula;
use pmc_model::random_dtmc;
use pmc_number::Value;
use pmc_program::BuildOptions;
use pmc_program::build;
use pmc_program::case_studies::crowds;
use pmc_program::case_studies::knuth_yao_die;
use pmc_reduction::BisimulationType;
use pmc_reduction::Preserved;
use pmc_reduction::Quotient;
use pmc_reduction::RefinementAlgorithm;
use pmc_reduction::perform_bisimulation;
use pmc_reduction::reduce_model;
use pmc_utilities::Timing;
use pmc_utilities::random_test;

/// Checks that the property has the same value in every state and its quotient state.
fn check_soundness<V: Value>(model: &Model<V>, quotient: &Quotient<V>, property: &Property, tolerance: f64) {
    let result = model_checking(model, property).unwrap();
    let quotient_result = model_checking(quotient.model(), property).unwrap();

    for state_index in model.iter_states() {
        let value = result.at(state_index);
        let quotient_value = quotient_result.at(quotient.quotient_state(state_index));
        assert!(
            value.is_close(quotient_value, tolerance),
            "State {state_index} has value {value}, but its quotient state {} has value {quotient_value}",
            quotient.quotient_state(state_index)
        );
    }
}

fn observe_property() -> Property {
    Property::eventually(StateFormula::label("observe0Greater1"))
}

#[test]
fn test_crowds_bisimulation() {
    let property = observe_property();
    let model: Model<f64> = build(&crowds(3, 3, false), &BuildOptions::from_properties(&[property.clone()])).unwrap();

    let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
    let minimised = quotient.model();
    assert!(minimised.num_of_states() < model.num_of_states());
    assert!(!minimised.supports_parameters());
    minimised.validate(1e-9).unwrap();

    check_soundness(&model, &quotient, &property, 1e-6);
}

#[test]
fn test_parametric_crowds_bisimulation() {
    let property = observe_property();
    let model = pmc_program::build_parametric_model(&crowds(2, 2, true), &BuildOptions::from_properties(&[property.clone()])).unwrap();
    let initial_state = model.initial_states()[0];
    assert_eq!(initial_state, StateIndex::new(0));

    let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
    let minimised = quotient.model();
    assert!(minimised.num_of_states() < model.num_of_states());
    assert!(minimised.has_parameters());
    minimised.validate(0.0).unwrap();
    assert_eq!(minimised.initial_states(), &[quotient.quotient_state(initial_state)]);

    // The rational functions are identical, not just close.
    let result = model_checking(&model, &property).unwrap();
    let quotient_result = model_checking(minimised, &property).unwrap();
    assert_eq!(
        result.at(initial_state),
        quotient_result.at(quotient.quotient_state(initial_state))
    );
}

#[test]
fn test_crowds_five_runs_five_members() {
    let property = observe_property();
    let model: Model<f64> = build(&crowds(5, 5, false), &BuildOptions::from_properties(&[property.clone()])).unwrap();
    assert_eq!(model.num_of_states(), 8607);
    assert_eq!(model.num_of_transitions(), 15113);
    assert!(!model.supports_parameters());

    let initial_state = model.initial_states()[0];
    assert_eq!(initial_state, StateIndex::new(0));
    let result = model_checking(&model, &property).unwrap();

    let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
    let minimised = quotient.model();
    assert_eq!(minimised.num_of_states(), 65);
    assert_eq!(minimised.num_of_transitions(), 105);
    assert!(!minimised.supports_parameters());

    // Blocks are numbered by their smallest state, so the initial state stays first.
    let quotient_initial_state = minimised.initial_states()[0];
    assert_eq!(quotient_initial_state, StateIndex::new(0));
    assert_eq!(quotient.quotient_state(initial_state), quotient_initial_state);

    let quotient_result = model_checking(minimised, &property).unwrap();
    assert!(
        result
            .at(initial_state)
            .is_close(quotient_result.at(quotient_initial_state), 1e-4)
    );
    assert!((result.at(initial_state) - 0.33288).abs() < 1e-4);
}

#[test]
fn test_parametric_crowds_three_runs_five_members() {
    let property = observe_property();
    let program = crowds(3, 5, true);
    assert!(program.has_undefined_constants());

    let model =
        pmc_program::build_parametric_model(&program, &BuildOptions::from_properties(&[property.clone()])).unwrap();
    assert_eq!(model.num_of_states(), 1147);
    assert_eq!(model.num_of_transitions(), 2013);
    assert!(model.has_parameters());

    let initial_state = model.initial_states()[0];
    assert_eq!(initial_state, StateIndex::new(0));
    let result = model_checking(&model, &property).unwrap();

    let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
    let minimised = quotient.model();
    assert_eq!(minimised.num_of_states(), 33);
    assert_eq!(minimised.num_of_transitions(), 53);
    assert!(minimised.has_parameters());

    let quotient_initial_state = minimised.initial_states()[0];
    assert_eq!(quotient_initial_state, StateIndex::new(0));
    assert_eq!(quotient.quotient_state(initial_state), quotient_initial_state);

    let quotient_result = model_checking(minimised, &property).unwrap();
    assert_eq!(result.at(initial_state), quotient_result.at(quotient_initial_state));
}

#[test_case(false, 5, 7 ; "fair coin")]
#[test_case(true, 7, 12 ; "parametric coin")]
fn test_die_bisimulation(parametric: bool, num_of_states: usize, num_of_transitions: usize) {
    let property = Property::eventually(StateFormula::label("done"));
    let options = BuildOptions::from_properties(&[property.clone()]);

    let (states, transitions) = if parametric {
        let model = pmc_program::build_parametric_model(&knuth_yao_die(true), &options).unwrap();
        let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
        check_soundness(&model, &quotient, &property, 0.0);
        (quotient.model().num_of_states(), quotient.model().num_of_transitions())
    } else {
        let model = pmc_program::build_model(&knuth_yao_die(false), &options).unwrap();
        let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
        check_soundness(&model, &quotient, &property, 1e-9);
        (quotient.model().num_of_states(), quotient.model().num_of_transitions())
    };

    assert_eq!(states, num_of_states);
    assert_eq!(transitions, num_of_transitions);
}

#[test]
fn test_die_expected_flips_bisimulation() {
    let property = Property::reward("coin_flips", StateFormula::label("done"));
    let model = pmc_program::build_model(&knuth_yao_die(false), &BuildOptions::from_properties(&[property.clone()])).unwrap();

    let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
    assert!(quotient.model().reward_model("coin_flips").is_some());
    check_soundness(&model, &quotient, &property, 1e-9);
}

#[test]
fn test_crowds_idempotence() {
    let property = observe_property();
    let model = pmc_program::build_parametric_model(&crowds(2, 2, true), &BuildOptions::from_properties(&[property.clone()])).unwrap();

    let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
    let again = perform_bisimulation(quotient.model(), &[property], BisimulationType::Strong).unwrap();

    assert_eq!(again.model().num_of_states(), quotient.model().num_of_states());
    assert_eq!(again.model().num_of_transitions(), quotient.model().num_of_transitions());
}

#[test]
fn test_crowds_determinism() {
    let property = observe_property();
    let preserved = Preserved::with_labels(["observe0Greater1"]);

    let minimise = |algorithm| {
        let model = pmc_program::build_parametric_model(&crowds(2, 2, true), &BuildOptions::from_properties(&[property.clone()])).unwrap();
        reduce_model(&model, &preserved, BisimulationType::Strong, algorithm, &mut Timing::new()).unwrap()
    };

    let first = minimise(RefinementAlgorithm::Sigref);
    let second = minimise(RefinementAlgorithm::Sigref);
    let naive = minimise(RefinementAlgorithm::SigrefNaive);

    assert_eq!(first.state_map(), second.state_map());
    assert!(first.model() == second.model(), "Minimising twice must give identical models");

    assert_eq!(first.state_map(), naive.state_map());
    assert!(first.model() == naive.model(), "Both refinement algorithms must give identical models");
}

#[test]
fn test_random_soundness() {
    random_test(30, |rng| {
        let model = random_dtmc::<f64>(rng, 15, 2, 3);

        for property in [
            Property::eventually(StateFormula::label("a")),
            Property::eventually(StateFormula::label("a").and(StateFormula::label("b").not())),
            Property::reward(RANDOM_REWARD_MODEL, StateFormula::label("b")),
        ] {
            let quotient = perform_bisimulation(&model, &[property.clone()], BisimulationType::Strong).unwrap();
            check_soundness(&model, &quotient, &property, 1e-6);
        }
    });
}
