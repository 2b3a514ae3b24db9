use std::collections::BTreeSet;
use std::fmt;

use pmc_model::ModelType;

use crate::Expression;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstantType {
    Bool,
    Int,
    Double,
}

impl fmt::Display for ConstantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantType::Bool => write!(f, "bool"),
            ConstantType::Int => write!(f, "int"),
            ConstantType::Double => write!(f, "double"),
        }
    }
}

/// `const type name = definition;`, the constant is undefined without a definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantDeclaration {
    name: String,
    constant_type: ConstantType,
    definition: Option<Expression>,
}

impl ConstantDeclaration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constant_type(&self) -> ConstantType {
        self.constant_type
    }

    pub fn definition(&self) -> Option<&Expression> {
        self.definition.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VariableType {
    Bool,
    /// The integers in `[lower..upper]`.
    Int { lower: Expression, upper: Expression },
}

/// A variable of a module, its initial value defaults to the lower bound or `false`.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    name: String,
    variable_type: VariableType,
    initial: Option<Expression>,
}

impl VariableDeclaration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable_type(&self) -> &VariableType {
        &self.variable_type
    }

    pub fn initial(&self) -> Option<&Expression> {
        self.initial.as_ref()
    }
}

/// `probability : (x1'=e1) & ... & (xn'=en)`
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub probability: Expression,
    pub assignments: Vec<(String, Expression)>,
}

impl Update {
    pub fn new<'a>(probability: Expression, assignments: impl IntoIterator<Item = (&'a str, Expression)>) -> Update {
        Update {
            probability,
            assignments: assignments
                .into_iter()
                .map(|(variable, expression)| (variable.to_string(), expression))
                .collect(),
        }
    }
}

/// `[action] guard -> updates;`
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub action: Option<String>,
    pub guard: Expression,
    pub updates: Vec<Update>,
}

impl Command {
    /// A command without action, which interleaves with the commands of other modules.
    pub fn new(guard: Expression, updates: Vec<Update>) -> Command {
        Command {
            action: None,
            guard,
            updates,
        }
    }

    /// A command that synchronises with the commands of other modules that have the same action.
    pub fn synchronised(action: &str, guard: Expression, updates: Vec<Update>) -> Command {
        Command {
            action: Some(action.to_string()),
            guard,
            updates,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    name: String,
    variables: Vec<VariableDeclaration>,
    commands: Vec<Command>,
}

impl Module {
    pub fn new(name: &str) -> Module {
        Module {
            name: name.to_string(),
            variables: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn add_int_variable(&mut self, name: &str, lower: Expression, upper: Expression, initial: Option<Expression>) {
        self.variables.push(VariableDeclaration {
            name: name.to_string(),
            variable_type: VariableType::Int { lower, upper },
            initial,
        });
    }

    pub fn add_bool_variable(&mut self, name: &str, initial: Option<Expression>) {
        self.variables.push(VariableDeclaration {
            name: name.to_string(),
            variable_type: VariableType::Bool,
            initial,
        });
    }

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[VariableDeclaration] {
        &self.variables
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the actions of the commands of this module.
    pub fn alphabet(&self) -> BTreeSet<&str> {
        self.commands
            .iter()
            .filter_map(|command| command.action.as_deref())
            .collect()
    }
}

/// `label "name" = expression;`
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    name: String,
    expression: Expression,
}

impl Label {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// `rewards "name" guard : value; ... endrewards`, only state rewards are supported.
#[derive(Clone, Debug, PartialEq)]
pub struct RewardStructure {
    name: String,
    state_rewards: Vec<(Expression, Expression)>,
}

impl RewardStructure {
    pub fn new(name: &str) -> RewardStructure {
        RewardStructure {
            name: name.to_string(),
            state_rewards: Vec::new(),
        }
    }

    /// Every state satisfying the guard earns the value, the values of all satisfied guards are summed.
    pub fn add_state_reward(&mut self, guard: Expression, value: Expression) {
        self.state_rewards.push((guard, value));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_rewards(&self) -> &[(Expression, Expression)] {
        &self.state_rewards
    }
}

/// The abstract syntax of a probabilistic program.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    model_type: ModelType,
    constants: Vec<ConstantDeclaration>,
    modules: Vec<Module>,
    init: Option<Expression>,
    labels: Vec<Label>,
    reward_structures: Vec<RewardStructure>,
}

impl Program {
    pub fn new(model_type: ModelType) -> Program {
        Program {
            model_type,
            constants: Vec::new(),
            modules: Vec::new(),
            init: None,
            labels: Vec::new(),
            reward_structures: Vec::new(),
        }
    }

    /// Declares a constant, which may refer to the constants declared before it.
    pub fn declare_constant(&mut self, name: &str, constant_type: ConstantType, definition: Option<Expression>) {
        self.constants.push(ConstantDeclaration {
            name: name.to_string(),
            constant_type,
            definition,
        });
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.push(module);
    }

    /// Replaces the initial values of the variables by a predicate, all valuations satisfying it are initial.
    pub fn set_init(&mut self, init: Expression) {
        self.init = Some(init);
    }

    pub fn add_label(&mut self, name: &str, expression: Expression) {
        self.labels.push(Label {
            name: name.to_string(),
            expression,
        });
    }

    pub fn add_reward_structure(&mut self, reward_structure: RewardStructure) {
        self.reward_structures.push(reward_structure);
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn num_of_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn constants(&self) -> &[ConstantDeclaration] {
        &self.constants
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantDeclaration> {
        self.constants.iter().find(|constant| constant.name == name)
    }

    pub fn has_undefined_constants(&self) -> bool {
        self.undefined_constants().next().is_some()
    }

    /// Returns the constants without a definition.
    pub fn undefined_constants(&self) -> impl Iterator<Item = &ConstantDeclaration> + '_ {
        self.constants.iter().filter(|constant| constant.definition.is_none())
    }

    pub fn init(&self) -> Option<&Expression> {
        self.init.as_ref()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|label| label.name == name)
    }

    pub fn reward_structures(&self) -> &[RewardStructure] {
        &self.reward_structures
    }

    pub fn reward_structure(&self, name: &str) -> Option<&RewardStructure> {
        self.reward_structures.iter().find(|reward| reward.name == name)
    }
}
