//! Well known probabilistic programs, expressed in the abstract syntax.

use pmc_model::ModelType;

use crate::Command;
use crate::ConstantType;
use crate::Expression;
use crate::Module;
use crate::Program;
use crate::RewardStructure;
use crate::Update;

fn var(name: &str) -> Expression {
    Expression::identifier(name)
}

fn int(value: i64) -> Expression {
    Expression::from(value)
}

/// The name of the variable that counts the observations of crowd member `index`.
fn observe(index: i64) -> String {
    format!("observe{index}")
}

/// The crowds protocol for anonymous web browsing by Reiter and Rubin, as
/// modelled in the PRISM case studies. A message is routed through a crowd of
/// `crowd_size` members for `total_runs` runs, and bad members observe the
/// member that forwarded the message to them. The labels are
/// `observe0Greater1`, which holds when the true sender was observed more
/// than once, `observeIGreater1` for any other member, and
/// `observeOnlyTrueSender`.
///
/// In the parametric variant the forwarding probability `PF` and the
/// probability `badC` that a member is bad are undefined constants.
pub fn crowds(total_runs: i64, crowd_size: i64, parametric: bool) -> Program {
    let mut program = Program::new(ModelType::Dtmc);

    if parametric {
        program.declare_constant("PF", ConstantType::Double, None);
        program.declare_constant("badC", ConstantType::Double, None);
    } else {
        program.declare_constant("PF", ConstantType::Double, Some(Expression::fraction(4, 5)));
        program.declare_constant("badC", ConstantType::Double, Some(Expression::fraction(167, 1000)));
    }

    program.declare_constant("notPF", ConstantType::Double, Some(int(1) - var("PF")));
    program.declare_constant("goodC", ConstantType::Double, Some(int(1) - var("badC")));
    program.declare_constant("TotalRuns", ConstantType::Int, Some(int(total_runs)));
    program.declare_constant("CrowdSize", ConstantType::Int, Some(int(crowd_size)));

    let mut module = Module::new("crowds");
    module.add_int_variable("phase", int(0), int(4), Some(int(0)));
    module.add_bool_variable("good", Some(Expression::from(false)));
    module.add_int_variable("runCount", int(0), var("TotalRuns"), Some(int(0)));
    for member in 0..crowd_size {
        module.add_int_variable(&observe(member), int(0), var("TotalRuns"), Some(int(0)));
    }
    module.add_int_variable("lastSeen", int(0), var("CrowdSize") - int(1), Some(int(0)));

    let phase = |value: i64| var("phase").equals(int(value));

    // Start a new run.
    module.add_command(Command::new(
        phase(0).and(var("runCount").less(var("TotalRuns"))),
        vec![Update::new(
            int(1),
            [
                ("phase", int(1)),
                ("runCount", var("runCount") + int(1)),
                ("lastSeen", int(0)),
            ],
        )],
    ));

    // The member that received the message is good or bad.
    module.add_command(Command::new(
        phase(1),
        vec![
            Update::new(var("goodC"), [("phase", int(2)), ("good", Expression::from(true))]),
            Update::new(var("badC"), [("phase", int(2)), ("good", Expression::from(false))]),
        ],
    ));

    // A good member forwards to a member chosen uniformly, who sees it as the last sender.
    module.add_command(Command::new(
        phase(2).and(var("good")),
        (0..crowd_size)
            .map(|member| {
                Update::new(
                    int(1) / var("CrowdSize"),
                    [("lastSeen", int(member)), ("phase", int(3))],
                )
            })
            .collect(),
    ));

    // A bad member records the last sender.
    for member in 0..crowd_size {
        let observed = observe(member);
        module.add_command(Command::new(
            Expression::all([
                phase(2),
                !var("good"),
                var("lastSeen").equals(int(member)),
                var(&observed).less(var("TotalRuns")),
            ]),
            vec![Update::new(
                int(1),
                [(observed.as_str(), var(&observed) + int(1)), ("phase", int(4))],
            )],
        ));
    }

    // Forward again or deliver the message.
    module.add_command(Command::new(
        phase(3),
        vec![
            Update::new(var("PF"), [("phase", int(1))]),
            Update::new(var("notPF"), [("phase", int(4))]),
        ],
    ));

    module.add_command(Command::new(phase(4), vec![Update::new(int(1), [("phase", int(0))])]));
    program.add_module(module);

    let greater_one = |member: i64| var(&observe(member)).greater(int(1));
    program.add_label("observe0Greater1", greater_one(0));
    program.add_label("observeIGreater1", Expression::any((1..crowd_size).map(greater_one)));
    program.add_label(
        "observeOnlyTrueSender",
        greater_one(0).and(Expression::all(
            (1..crowd_size).map(|member| var(&observe(member)).less_equal(int(1))),
        )),
    );

    program
}

/// The result of a coin flip of the die: the next coin state or the face.
enum Outcome {
    Coin(i64),
    Face(i64),
}

/// The die of Knuth and Yao, simulated by a coin that shows heads with
/// probability `p`. The coin states are `s = 0..6`, the face `d` is decided
/// in `s = 7`. The labels `one` to `six` and `done` mark the faces, and the
/// reward structure `coin_flips` counts the coin flips.
///
/// The coin is fair, unless the model is parametric in which case `p` is an
/// undefined constant.
pub fn knuth_yao_die(parametric: bool) -> Program {
    let mut program = Program::new(ModelType::Dtmc);
    program.declare_constant("p", ConstantType::Double, (!parametric).then(|| Expression::fraction(1, 2)));

    let mut module = Module::new("die");
    module.add_int_variable("s", int(0), int(7), Some(int(0)));
    module.add_int_variable("d", int(0), int(6), Some(int(0)));

    let coins = [
        (0, Outcome::Coin(1), Outcome::Coin(2)),
        (1, Outcome::Coin(3), Outcome::Coin(4)),
        (2, Outcome::Coin(5), Outcome::Coin(6)),
        (3, Outcome::Coin(1), Outcome::Face(1)),
        (4, Outcome::Face(2), Outcome::Face(3)),
        (5, Outcome::Face(4), Outcome::Face(5)),
        (6, Outcome::Coin(2), Outcome::Face(6)),
    ];

    let outcome = |probability: Expression, outcome: Outcome| match outcome {
        Outcome::Coin(coin) => Update::new(probability, [("s", int(coin))]),
        Outcome::Face(face) => Update::new(probability, [("s", int(7)), ("d", int(face))]),
    };

    for (coin, heads, tails) in coins {
        module.add_command(Command::new(
            var("s").equals(int(coin)),
            vec![outcome(var("p"), heads), outcome(int(1) - var("p"), tails)],
        ));
    }

    module.add_command(Command::new(
        var("s").equals(int(7)),
        vec![Update::new(int(1), [("s", int(7))])],
    ));
    program.add_module(module);

    for (face, name) in ["one", "two", "three", "four", "five", "six"].into_iter().enumerate() {
        program.add_label(
            name,
            var("s").equals(int(7)).and(var("d").equals(int(face as i64 + 1))),
        );
    }
    program.add_label("done", var("s").equals(int(7)));

    let mut flips = RewardStructure::new("coin_flips");
    flips.add_state_reward(var("s").less(int(7)), int(1));
    program.add_reward_structure(flips);

    program
}
