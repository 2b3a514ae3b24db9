use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use log::info;
use log::trace;
use log::warn;
use rustc_hash::FxHashMap;

use pmc_io::LargeFormatter;
use pmc_io::TimeProgress;
use pmc_model::Model;
use pmc_model::ModelBuilder;
use pmc_model::ModelType;
use pmc_model::StateIndex;
use pmc_number::RationalFunction;
use pmc_number::Value;

use crate::BuildError;
use crate::BuildOptions;
use crate::Command;
use crate::Expression;
use crate::Label;
use crate::Program;
use crate::RewardStructure;
use crate::constants::Constants;
use crate::constants::resolve_constants;
use crate::expression::Environment;
use crate::variables::VariableTable;

/// The label of the initial states.
pub const INIT_LABEL: &str = "init";

/// The label of the states without enabled commands, which obtained a self-loop.
pub const DEADLOCK_LABEL: &str = "deadlock";

/// The tolerance for the sum of the outgoing probabilities of numeric models.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Builds the model of the program with numeric probabilities, all constants must be defined.
pub fn build_model(program: &Program, options: &BuildOptions) -> Result<Model<f64>, BuildError> {
    build(program, options)
}

/// Builds the model of the program where the undefined `double` constants are parameters.
pub fn build_parametric_model(program: &Program, options: &BuildOptions) -> Result<Model<RationalFunction>, BuildError> {
    build(program, options)
}

/// Explores the reachable valuations of the program breadth first. The
/// initial states come first, followed by the other states in the order in
/// which they are discovered, so the numbering is deterministic.
///
/// The commands without action of all modules interleave, and commands with
/// an action synchronise with all modules that have that action. Since a DTMC
/// has a single distribution per state, several enabled choices are combined
/// uniformly.
pub fn build<V: Value>(program: &Program, options: &BuildOptions) -> Result<Model<V>, BuildError> {
    if program.model_type() != ModelType::Dtmc {
        return Err(BuildError::UnsupportedModelType(program.model_type()));
    }

    let constants = resolve_constants::<V>(program, &options.constants)?;
    let variables = VariableTable::new(program, &constants)?;
    let labels = selected_labels(program, options)?;
    let reward_structures = selected_reward_structures(program, options)?;

    let mut explorer = Explorer::new(program, &constants, &variables);
    let mut builder = ModelBuilder::new();

    for valuation in explorer.initial_valuations()? {
        builder.add_initial_state(explorer.discover(valuation));
    }

    let num_of_initial_states = explorer.num_of_states();
    if num_of_initial_states == 0 {
        return Err(BuildError::MalformedModel("there are no initial states".to_string()));
    }

    let progress = TimeProgress::new(
        |num_of_states: usize| {
            debug!("Explored {} states...", LargeFormatter(num_of_states));
        },
        1,
    );

    let mut deadlocks = Vec::new();
    let mut num_of_combined = 0;
    let mut current = 0;
    while current < explorer.num_of_states() {
        let state_index = StateIndex::new(current);
        let valuation = explorer.valuation(state_index).to_vec();
        current += 1;

        let choices = explorer.choices(&valuation)?;
        if choices.is_empty() {
            if !options.fix_deadlocks {
                return Err(BuildError::MalformedModel(format!(
                    "state {} has no enabled commands",
                    variables.format(&valuation)
                )));
            }

            trace!("Fixing deadlock in state {}", variables.format(&valuation));
            deadlocks.push(state_index);
            builder.add_transition(state_index, state_index, V::one());
            continue;
        }

        let scale = if choices.len() > 1 {
            trace!(
                "Combining {} choices in state {}",
                choices.len(),
                variables.format(&valuation)
            );
            num_of_combined += 1;
            Some(V::one().div(&V::from_integer(choices.len() as i64)))
        } else {
            None
        };

        for (target, probability) in choices.into_iter().flatten() {
            let to = explorer.discover(target);
            let probability = match &scale {
                Some(scale) => probability.mul(scale),
                None => probability,
            };

            builder.add_transition(state_index, to, probability);
        }

        progress.print(explorer.num_of_states());
    }

    if num_of_combined > 0 {
        warn!(
            "{} states have several enabled choices, these were combined uniformly",
            LargeFormatter(num_of_combined)
        );
    }

    if !deadlocks.is_empty() {
        warn!("Fixed {} deadlock states by adding a self-loop", LargeFormatter(deadlocks.len()));
    }

    builder.add_label(INIT_LABEL);
    for state_index in StateIndex::range(num_of_initial_states) {
        builder.add_state_label(state_index, INIT_LABEL);
    }

    builder.add_label(DEADLOCK_LABEL);
    for state_index in deadlocks {
        builder.add_state_label(state_index, DEADLOCK_LABEL);
    }

    add_labels_and_rewards(&explorer, &labels, &reward_structures, &mut builder)?;

    let model = builder.finish(ModelType::Dtmc)?;
    info!(
        "Built a {} with {} states and {} transitions",
        model.model_type(),
        LargeFormatter(model.num_of_states()),
        LargeFormatter(model.num_of_transitions())
    );

    Ok(model)
}

/// Evaluates the labels and the state rewards in every explored state.
fn add_labels_and_rewards<V: Value>(
    explorer: &Explorer<'_, V>,
    labels: &[&Label],
    reward_structures: &[&RewardStructure],
    builder: &mut ModelBuilder<V>,
) -> Result<(), BuildError> {
    for label in labels {
        builder.add_label(label.name());
    }

    for reward_structure in reward_structures {
        builder.add_reward_model(reward_structure.name());
    }

    for state_index in StateIndex::range(explorer.num_of_states()) {
        let env = explorer.environment(explorer.valuation(state_index));

        for label in labels {
            if label.expression().evaluate_bool(&env)? {
                builder.add_state_label(state_index, label.name());
            }
        }

        for reward_structure in reward_structures {
            let mut values = Vec::new();
            for (guard, value) in reward_structure.state_rewards() {
                if guard.evaluate_bool(&env)? {
                    values.push(value.evaluate_value::<V>(&env)?);
                }
            }

            let reward = V::sum_canonical(values);
            if !reward.is_zero() {
                builder.add_state_reward(reward_structure.name(), state_index, reward);
            }
        }
    }

    Ok(())
}

/// Returns the labels of the program that must be built.
fn selected_labels<'a>(program: &'a Program, options: &BuildOptions) -> Result<Vec<&'a Label>, BuildError> {
    if let Some(label) = program
        .labels()
        .iter()
        .find(|label| label.name() == INIT_LABEL || label.name() == DEADLOCK_LABEL)
    {
        return Err(BuildError::MalformedModel(format!(
            "the label \"{}\" is reserved",
            label.name()
        )));
    }

    match &options.labels {
        None => Ok(program.labels().iter().collect()),
        Some(names) => names
            .iter()
            .filter(|name| *name != INIT_LABEL && *name != DEADLOCK_LABEL)
            .map(|name| {
                program
                    .label(name)
                    .ok_or_else(|| BuildError::UnknownLabel(name.clone()))
            })
            .collect(),
    }
}

/// Returns the reward structures of the program that must be built.
fn selected_reward_structures<'a>(
    program: &'a Program,
    options: &BuildOptions,
) -> Result<Vec<&'a RewardStructure>, BuildError> {
    match &options.reward_structures {
        None => Ok(program.reward_structures().iter().collect()),
        Some(names) => names
            .iter()
            .map(|name| {
                program
                    .reward_structure(name)
                    .ok_or_else(|| BuildError::UnknownRewardStructure(name.clone()))
            })
            .collect(),
    }
}

/// The successor valuations of a choice together with their probabilities.
type Distribution<V> = Vec<(Vec<i64>, V)>;

/// Stores the discovered valuations and computes the successors of a valuation.
struct Explorer<'a, V> {
    constants: &'a Constants<V>,
    variables: &'a VariableTable,
    init: Option<&'a Expression>,

    /// The commands without action of all modules.
    interleaved: Vec<&'a Command>,

    /// For every action, the commands with that action of every module that has it in its alphabet.
    synchronised: BTreeMap<&'a str, Vec<Vec<&'a Command>>>,

    /// The valuation of every state, indexed by state.
    states: Vec<Vec<i64>>,
    discovered: FxHashMap<Vec<i64>, StateIndex>,
}

impl<'a, V: Value> Explorer<'a, V> {
    fn new(program: &'a Program, constants: &'a Constants<V>, variables: &'a VariableTable) -> Explorer<'a, V> {
        let mut interleaved = Vec::new();
        let mut synchronised: BTreeMap<&str, Vec<Vec<&Command>>> = BTreeMap::new();

        for module in program.modules() {
            let mut per_action: BTreeMap<&str, Vec<&Command>> = BTreeMap::new();
            for command in module.commands() {
                match &command.action {
                    None => interleaved.push(command),
                    Some(action) => per_action.entry(action.as_str()).or_default().push(command),
                }
            }

            for (action, commands) in per_action {
                synchronised.entry(action).or_default().push(commands);
            }
        }

        debug!(
            "The program has {} variables, {} interleaved commands and {} synchronising actions",
            variables.len(),
            interleaved.len(),
            synchronised.len()
        );

        Explorer {
            constants,
            variables,
            init: program.init(),
            interleaved,
            synchronised,
            states: Vec::new(),
            discovered: FxHashMap::default(),
        }
    }

    fn num_of_states(&self) -> usize {
        self.states.len()
    }

    fn valuation(&self, state_index: StateIndex) -> &[i64] {
        &self.states[state_index]
    }

    fn environment<'b>(&'b self, state: &'b [i64]) -> Environment<'b, V> {
        Environment {
            constants: self.constants,
            variables: self.variables,
            state,
        }
    }

    /// Returns the index of the given valuation, which becomes a new state when it has not been discovered before.
    fn discover(&mut self, valuation: Vec<i64>) -> StateIndex {
        if let Some(state_index) = self.discovered.get(&valuation) {
            return *state_index;
        }

        let state_index = StateIndex::new(self.states.len());
        self.states.push(valuation.clone());
        self.discovered.insert(valuation, state_index);
        state_index
    }

    /// The valuations satisfying the init predicate, or the initial values of the variables.
    fn initial_valuations(&self) -> Result<Vec<Vec<i64>>, BuildError> {
        let Some(init) = self.init else {
            return Ok(vec![self.variables.initial_valuation()]);
        };

        let mut result = Vec::new();
        for valuation in self.variables.all_valuations() {
            if init.evaluate_bool(&self.environment(&valuation))? {
                result.push(valuation);
            }
        }

        Ok(result)
    }

    /// Returns the distribution of every enabled choice in the given valuation.
    fn choices(&self, valuation: &[i64]) -> Result<Vec<Distribution<V>>, BuildError> {
        let env = self.environment(valuation);
        let mut choices = Vec::new();

        for command in &self.interleaved {
            if command.guard.evaluate_bool(&env)? {
                choices.push(self.distribution(&[*command], &env)?);
            }
        }

        for (action, participants) in &self.synchronised {
            let mut enabled = Vec::with_capacity(participants.len());
            for commands in participants {
                let mut module_enabled = Vec::new();
                for command in commands {
                    if command.guard.evaluate_bool(&env)? {
                        module_enabled.push(*command);
                    }
                }

                enabled.push(module_enabled);
            }

            // Every module must participate, so one module without enabled commands blocks the action.
            for combination in enabled.into_iter().multi_cartesian_product() {
                trace!("Synchronising {} commands on action {action}", combination.len());
                choices.push(self.distribution(&combination, &env)?);
            }
        }

        Ok(choices)
    }

    /// Computes the product of the updates of the given commands, the
    /// assignments are evaluated in the source valuation.
    fn distribution(&self, commands: &[&Command], env: &Environment<'_, V>) -> Result<Distribution<V>, BuildError> {
        let mut result: Distribution<V> = vec![(env.state.to_vec(), V::one())];

        for command in commands {
            let mut next = Vec::with_capacity(result.len() * command.updates.len());

            for update in &command.updates {
                let probability: V = update.probability.evaluate_value(env)?;
                if probability.to_f64().is_some_and(|value| value < 0.0) {
                    return Err(BuildError::MalformedModel(format!(
                        "the probability {} evaluates to the negative value {probability} in state {}",
                        update.probability,
                        self.variables.format(env.state)
                    )));
                }

                if probability.is_zero() {
                    continue;
                }

                let mut assignments = Vec::with_capacity(update.assignments.len());
                for (name, expression) in &update.assignments {
                    let position = self
                        .variables
                        .position(name)
                        .ok_or_else(|| BuildError::InvalidExpression {
                            expression: expression.to_string(),
                            reason: format!("assigned to the unknown variable {name}"),
                        })?;
                    assignments.push((position, self.variables.convert(position, expression.evaluate(env)?)?));
                }

                for (target, value) in &result {
                    let mut target = target.clone();
                    for (position, assigned) in &assignments {
                        target[*position] = *assigned;
                    }

                    next.push((target, value.mul(&probability)));
                }
            }

            result = next;
        }

        let mass = V::sum_canonical(result.iter().map(|(_, probability)| probability.clone()).collect());
        if !mass.is_close(&V::one(), PROBABILITY_TOLERANCE) {
            return Err(BuildError::MalformedModel(format!(
                "the probabilities of a choice in state {} sum to {mass} instead of one",
                self.variables.format(env.state)
            )));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use pmc_number::rational;

    use crate::ConstantType;
    use crate::Module;
    use crate::Update;
    use crate::case_studies::knuth_yao_die;

    fn var(name: &str) -> Expression {
        Expression::identifier(name)
    }

    fn int(value: i64) -> Expression {
        Expression::from(value)
    }

    /// A counter `x` in `[0..upper]` that is incremented while it is below `bound`.
    fn counter(upper: i64, bound: i64) -> Program {
        let mut program = Program::new(ModelType::Dtmc);
        let mut module = Module::new("counter");
        module.add_int_variable("x", int(0), int(upper), None);
        module.add_command(Command::new(
            var("x").less(int(bound)),
            vec![Update::new(int(1), [("x", var("x") + int(1))])],
        ));
        program.add_module(module);
        program.add_label("full", var("x").equals(int(upper)));
        program
    }

    #[test]
    fn test_build_knuth_yao_die() {
        let model = build_model(&knuth_yao_die(false), &BuildOptions::default()).unwrap();

        assert_eq!(model.num_of_states(), 13);
        assert_eq!(model.num_of_transitions(), 20);
        assert_eq!(model.initial_states(), &[StateIndex::new(0)]);
        assert!(!model.has_parameters());
        model.validate(1e-9).unwrap();

        let labeling = model.labeling();
        assert!(labeling.has_label(StateIndex::new(0), INIT_LABEL));
        assert_eq!(labeling.states_with_label("done").unwrap().count_ones(), 6);
        assert_eq!(labeling.states_with_label("one").unwrap().count_ones(), 1);
        assert_eq!(labeling.states_with_label(DEADLOCK_LABEL).unwrap().count_ones(), 0);

        let flips = model.reward_model("coin_flips").unwrap();
        assert_eq!(flips.state_rewards().iter().filter(|reward| **reward == 1.0).count(), 7);
    }

    #[test]
    fn test_build_parametric_die() {
        let program = knuth_yao_die(true);
        assert!(program.has_undefined_constants());

        let model = build_parametric_model(&program, &BuildOptions::default()).unwrap();
        assert_eq!(model.num_of_states(), 13);
        assert!(model.has_parameters());
        model.validate(0.0).unwrap();

        // The parameter has no value in the numeric case.
        assert!(matches!(
            build_model(&program, &BuildOptions::default()),
            Err(BuildError::UndefinedConstant(name)) if name == "p"
        ));

        // Unless it is given one.
        let options = BuildOptions::default().with_constant("p", rational(1, 3));
        build_model(&program, &options).unwrap().validate(1e-9).unwrap();
    }

    #[test]
    fn test_build_deadlocks() {
        let model = build_model(&counter(2, 2), &BuildOptions::default()).unwrap();
        assert_eq!(model.num_of_states(), 3);
        assert_eq!(model.num_of_transitions(), 3);
        assert!(model.labeling().has_label(StateIndex::new(2), DEADLOCK_LABEL));
        assert!(model.labeling().has_label(StateIndex::new(2), "full"));

        let options = BuildOptions {
            fix_deadlocks: false,
            ..BuildOptions::default()
        };
        assert!(matches!(
            build_model(&counter(2, 2), &options),
            Err(BuildError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_build_variable_out_of_bounds() {
        assert!(matches!(
            build_model(&counter(2, 3), &BuildOptions::default()),
            Err(BuildError::VariableOutOfBounds { value: 3, upper: 2, .. })
        ));
    }

    #[test]
    fn test_build_malformed_distribution() {
        let mut program = Program::new(ModelType::Dtmc);
        let mut module = Module::new("coin");
        module.add_bool_variable("heads", None);
        module.add_command(Command::new(
            Expression::from(true),
            vec![Update::new(Expression::fraction(1, 2), [("heads", Expression::from(true))])],
        ));
        program.add_module(module);

        assert!(matches!(
            build_model(&program, &BuildOptions::default()),
            Err(BuildError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_build_no_initial_states() {
        let mut program = counter(2, 2);
        program.set_init(var("x").equals(int(7)));

        assert!(matches!(
            build_model(&program, &BuildOptions::default()),
            Err(BuildError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_build_empty_support() {
        // The only update has probability zero, so the enabled choice has no successors.
        let mut program = Program::new(ModelType::Dtmc);
        let mut module = Module::new("stuck");
        module.add_int_variable("x", int(0), int(1), None);
        module.add_command(Command::new(
            Expression::from(true),
            vec![Update::new(int(0), [("x", int(1))])],
        ));
        program.add_module(module);

        assert!(matches!(
            build_model(&program, &BuildOptions::default()),
            Err(BuildError::MalformedModel(_))
        ));
        assert!(matches!(
            build_parametric_model(&program, &BuildOptions::default()),
            Err(BuildError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_build_unsupported_model_type() {
        let program = Program::new(ModelType::Mdp);
        assert!(matches!(
            build_model(&program, &BuildOptions::default()),
            Err(BuildError::UnsupportedModelType(ModelType::Mdp))
        ));
    }

    #[test]
    fn test_build_unknown_label() {
        let options = BuildOptions {
            labels: Some(["empty".to_string()].into()),
            ..BuildOptions::default()
        };

        assert!(matches!(
            build_model(&counter(2, 2), &options),
            Err(BuildError::UnknownLabel(name)) if name == "empty"
        ));
    }

    #[test]
    fn test_build_interleaving_is_uniform() {
        let mut program = Program::new(ModelType::Dtmc);
        for name in ["x", "y"] {
            let mut module = Module::new(name);
            module.add_bool_variable(name, None);
            module.add_command(Command::new(
                !var(name),
                vec![Update::new(int(1), [(name, Expression::from(true))])],
            ));
            program.add_module(module);
        }

        let model = build_model(&program, &BuildOptions::default()).unwrap();
        assert_eq!(model.num_of_states(), 4);
        assert_eq!(model.num_of_transitions(), 5);

        let initial: Vec<_> = model
            .outgoing_transitions(StateIndex::new(0))
            .map(|transition| (transition.to, *transition.value))
            .collect();
        assert_eq!(initial, vec![(StateIndex::new(1), 0.5), (StateIndex::new(2), 0.5)]);
    }

    #[test]
    fn test_build_synchronisation() {
        let mut program = Program::new(ModelType::Dtmc);

        let mut sender = Module::new("sender");
        sender.add_int_variable("x", int(0), int(1), None);
        sender.add_command(Command::synchronised(
            "send",
            var("x").equals(int(0)),
            vec![
                Update::new(Expression::fraction(1, 2), [("x", int(1))]),
                Update::new(Expression::fraction(1, 2), [("x", int(0))]),
            ],
        ));
        program.add_module(sender);

        let mut receiver = Module::new("receiver");
        receiver.add_int_variable("y", int(0), int(1), None);
        receiver.add_command(Command::synchronised(
            "send",
            var("y").equals(int(0)),
            vec![Update::new(int(1), [("y", int(1))])],
        ));
        program.add_module(receiver);

        // From (0, 0) both move together, afterwards the receiver blocks the action.
        let model = build_model(&program, &BuildOptions::default()).unwrap();
        assert_eq!(model.num_of_states(), 3);
        assert_eq!(model.num_of_transitions(), 4);
        assert_eq!(
            model
                .labeling()
                .states_with_label(DEADLOCK_LABEL)
                .unwrap()
                .iter_ones()
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_build_init_predicate() {
        let mut program = Program::new(ModelType::Dtmc);
        program.declare_constant("N", ConstantType::Int, Some(int(2)));

        let mut module = Module::new("pair");
        module.add_int_variable("x", int(0), var("N"), None);
        module.add_int_variable("y", int(0), var("N"), None);
        module.add_command(Command::new(
            Expression::from(true),
            vec![Update::new(int(1), [("x", var("y")), ("y", var("x"))])],
        ));
        program.add_module(module);
        program.set_init((var("x") + var("y")).equals(var("N")));

        // The initial states (0, 2), (1, 1) and (2, 0) in lexicographical order.
        let model = build_model(&program, &BuildOptions::default()).unwrap();
        assert_eq!(model.num_of_states(), 3);
        assert_eq!(
            model.initial_states(),
            &[StateIndex::new(0), StateIndex::new(1), StateIndex::new(2)]
        );

        // The assignments are evaluated in the source state, so the values are swapped.
        let successors: Vec<_> = model
            .outgoing_transitions(StateIndex::new(0))
            .map(|transition| transition.to)
            .collect();
        assert_eq!(successors, vec![StateIndex::new(2)]);
    }
}
