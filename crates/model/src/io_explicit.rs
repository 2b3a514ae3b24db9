#![forbid(unsafe_code)]

use std::io::BufWriter;
use std::io::Read;
use std::io::Write;

use log::info;
use log::trace;
use log::warn;
use regex::Regex;
use streaming_iterator::StreamingIterator;
use thiserror::Error;

use pmc_io::LargeFormatter;
use pmc_io::LineIterator;
use pmc_io::TimeProgress;
use pmc_utilities::PmcError;

use crate::Model;
use crate::ModelBuilder;
use crate::ModelType;
use crate::StateIndex;

/// The label that marks the initial states in the `.lab` format.
const INITIAL_LABEL: &str = "init";

#[derive(Error, Debug)]
pub enum IOError {
    #[error("Invalid .tra header {0}")]
    InvalidTransitionHeader(&'static str),

    #[error("Invalid transition on line {0}: {1}")]
    InvalidTransition(usize, String),

    #[error("Invalid .lab header {0}")]
    InvalidLabelHeader(String),

    #[error("Invalid state labels on line {0}: {1}")]
    InvalidStateLabels(usize, String),

    #[error("The .tra file declares {expected} transitions, but contains {found}")]
    TransitionCount { expected: usize, found: usize },
}

/// Loads a DTMC in the explicit [PRISM
/// format](https://www.prismmodelchecker.org/manual/Appendices/ExplicitModelFiles)
/// from a transition file and a label file.
///
/// The `.tra` file consists of a header `<num_of_states> <num_of_transitions>`
/// followed by one line `<from> <to> <probability>` for every transition.
///
/// The `.lab` file consists of a header `0="init" 1="goal" ...` declaring the
/// labels, followed by lines `<state>: <label> <label> ...`. The states
/// labelled `init` are the initial states, and when that label is absent state
/// zero is the initial state.
pub fn read_explicit(transitions: impl Read, labels: impl Read) -> Result<Model<f64>, PmcError> {
    info!("Reading DTMC in explicit format...");

    let mut builder = ModelBuilder::new();
    read_tra(transitions, &mut builder)?;
    let has_initial_label = read_lab(labels, &mut builder)?;

    if !has_initial_label {
        warn!("The label file does not declare the \"{INITIAL_LABEL}\" label, using state 0 as initial state");
        builder.add_initial_state(StateIndex::new(0));
    }

    info!("Finished reading DTMC");
    Ok(builder.finish(ModelType::Dtmc)?)
}

/// Reads the transitions of a `.tra` file into the given builder.
fn read_tra(reader: impl Read, builder: &mut ModelBuilder<f64>) -> Result<(), PmcError> {
    let mut lines = LineIterator::new(reader);
    lines.advance();
    let header = lines
        .get()
        .ok_or(IOError::InvalidTransitionHeader("The first line should be the header"))?;

    let (num_of_states, num_of_transitions) = match header.split_whitespace().collect::<Vec<_>>()[..] {
        [states, transitions] => (states.parse::<usize>()?, transitions.parse::<usize>()?),
        _ => {
            return Err(IOError::InvalidTransitionHeader("does not match <num_of_states> <num_of_transitions>").into());
        }
    };

    builder.require_num_of_states(num_of_states);
    let progress = TimeProgress::new(
        move |read: usize| {
            info!(
                "Read {} transitions {}%...",
                LargeFormatter(read),
                read * 100 / num_of_transitions.max(1)
            )
        },
        1,
    );

    let mut found = 0;
    loop {
        lines.advance();
        let Some(line) = lines.get() else {
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        let (from, to, probability) = read_transition(line)
            .ok_or_else(|| IOError::InvalidTransition(lines.line_number(), line.clone()))?;

        trace!("Read transition {from} --[{probability}]-> {to}");
        builder.add_transition(from, to, probability);
        found += 1;

        progress.print(found);
    }

    if found != num_of_transitions {
        return Err(IOError::TransitionCount {
            expected: num_of_transitions,
            found,
        }
        .into());
    }

    Ok(())
}

/// Parses `<from> <to> <probability>`.
fn read_transition(line: &str) -> Option<(StateIndex, StateIndex, f64)> {
    let mut parts = line.split_whitespace();
    let from = StateIndex::new(parts.next()?.parse().ok()?);
    let to = StateIndex::new(parts.next()?.parse().ok()?);
    let probability = parts.next()?.parse().ok()?;

    if parts.next().is_some() {
        return None;
    }

    Some((from, to, probability))
}

/// Reads the labels of a `.lab` file into the given builder, returns true iff
/// the initial label was declared.
fn read_lab(reader: impl Read, builder: &mut ModelBuilder<f64>) -> Result<bool, PmcError> {
    let mut lines = LineIterator::new(reader);
    lines.advance();
    let header = match lines.get() {
        Some(header) => header.clone(),
        None => return Ok(false),
    };

    // Regex for <index>="<name>"
    let declaration_regex = Regex::new(r#"^\s*([0-9]+)\s*=\s*"([^"]*)"\s*"#).expect("Regex compilation should not fail");

    let mut names: Vec<Option<String>> = Vec::new();
    let mut rest = header.as_str();
    while !rest.trim().is_empty() {
        let captures = declaration_regex
            .captures(rest)
            .ok_or_else(|| IOError::InvalidLabelHeader(header.clone()))?;
        let (matched, [index_txt, name]) = captures.extract();

        let index: usize = index_txt.parse()?;
        if names.len() <= index {
            names.resize(index + 1, None);
        }
        names[index] = Some(name.to_string());
        rest = &rest[matched.len()..];
    }

    let mut has_initial_label = false;
    for name in names.iter().flatten() {
        if name == INITIAL_LABEL {
            has_initial_label = true;
        } else {
            builder.add_label(name);
        }
    }

    loop {
        lines.advance();
        let Some(line) = lines.get() else {
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        let invalid = || IOError::InvalidStateLabels(lines.line_number(), line.clone());
        let (state_txt, labels_txt) = line.split_once(':').ok_or_else(invalid)?;
        let state_index = StateIndex::new(state_txt.trim().parse().map_err(|_| invalid())?);

        for index_txt in labels_txt.split_whitespace() {
            let index: usize = index_txt.parse().map_err(|_| invalid())?;
            let name = names.get(index).and_then(|name| name.as_ref()).ok_or_else(invalid)?;

            if name == INITIAL_LABEL {
                builder.add_initial_state(state_index);
            } else {
                builder.add_state_label(state_index, name);
            }
        }
    }

    Ok(has_initial_label)
}

/// Writes a DTMC in the explicit format, see [read_explicit].
///
/// Note that the writers are buffered internally using a `BufWriter`.
pub fn write_explicit(
    transitions: &mut impl Write,
    labels: &mut impl Write,
    model: &Model<f64>,
) -> Result<(), PmcError> {
    info!("Writing DTMC in explicit format...");

    let mut writer = BufWriter::new(transitions);
    writeln!(writer, "{} {}", model.num_of_states(), model.num_of_transitions())?;

    let num_of_transitions = model.num_of_transitions();
    let progress = TimeProgress::new(
        move |written: usize| {
            info!(
                "Wrote {} transitions {}%...",
                LargeFormatter(written),
                written * 100 / num_of_transitions.max(1)
            )
        },
        1,
    );

    let mut transitions_written = 0usize;
    for state_index in model.iter_states() {
        for transition in model.outgoing_transitions(state_index) {
            writeln!(writer, "{} {} {}", state_index, transition.to, transition.value)?;

            progress.print(transitions_written);
            transitions_written += 1;
        }
    }

    writer.flush()?;

    // The initial label always has index zero.
    let names: Vec<&str> = std::iter::once(INITIAL_LABEL)
        .chain(model.labeling().label_names().filter(|name| *name != INITIAL_LABEL))
        .collect();

    let mut writer = BufWriter::new(labels);
    let header: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(index, name)| format!("{index}=\"{name}\""))
        .collect();
    writeln!(writer, "{}", header.join(" "))?;

    for state_index in model.iter_states() {
        let indices: Vec<String> = names
            .iter()
            .enumerate()
            .filter(|(index, name)| {
                if *index == 0 {
                    model.is_initial_state(state_index)
                } else {
                    model.labeling().has_label(state_index, name)
                }
            })
            .map(|(index, _)| index.to_string())
            .collect();

        if !indices.is_empty() {
            writeln!(writer, "{}: {}", state_index, indices.join(" "))?;
        }
    }
    writer.flush()?;

    info!("Finished writing DTMC.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use pmc_utilities::random_test;

    use crate::random_dtmc;

    const DIE_TRA: &str = "4 6
0 1 0.5
0 2 0.5
1 3 1
2 2 0.5
2 3 0.5
3 3 1
";

    const DIE_LAB: &str = "0=\"init\" 1=\"done\" 2=\"unused\"
0: 0
3: 1
";

    #[test]
    fn test_reading_explicit() {
        let model = read_explicit(DIE_TRA.as_bytes(), DIE_LAB.as_bytes()).unwrap();

        assert_eq!(model.num_of_states(), 4);
        assert_eq!(model.num_of_transitions(), 6);
        assert_eq!(model.initial_states(), &[StateIndex::new(0)]);
        assert!(model.labeling().has_label(StateIndex::new(3), "done"));
        assert!(model.labeling().contains_label("unused"));
        assert!(!model.labeling().contains_label("init"));
        model.validate(1e-6).unwrap();
    }

    #[test]
    fn test_explicit_failure() {
        let wrong_header = "4\n0 1 1.0\n";
        assert!(read_explicit(wrong_header.as_bytes(), DIE_LAB.as_bytes()).is_err());

        let wrong_transition = "4 1\n0 1 one\n";
        assert!(read_explicit(wrong_transition.as_bytes(), DIE_LAB.as_bytes()).is_err());

        let wrong_count = "4 2\n0 1 1.0\n";
        assert!(read_explicit(wrong_count.as_bytes(), DIE_LAB.as_bytes()).is_err());

        let wrong_label = "0=\"init\"\n0: 5\n";
        assert!(read_explicit(DIE_TRA.as_bytes(), wrong_label.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_initial_label() {
        let model = read_explicit(DIE_TRA.as_bytes(), "0=\"done\"\n3: 0\n".as_bytes()).unwrap();
        assert_eq!(model.initial_states(), &[StateIndex::new(0)]);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_explicit_io() {
        random_test(100, |rng| {
            let model = random_dtmc::<f64>(rng, 20, 3, 4);

            let mut transitions: Vec<u8> = Vec::new();
            let mut labels: Vec<u8> = Vec::new();
            write_explicit(&mut transitions, &mut labels, &model).unwrap();

            let result = read_explicit(&transitions[..], &labels[..]).unwrap();

            assert_eq!(result.num_of_states(), model.num_of_states());
            assert_eq!(result.num_of_transitions(), model.num_of_transitions());
            assert_eq!(result.initial_states(), model.initial_states());
            for state_index in model.iter_states() {
                assert!(
                    model
                        .outgoing_transitions(state_index)
                        .eq(result.outgoing_transitions(state_index)),
                    "The transitions of state {state_index} differ"
                );
                assert!(
                    model
                        .labeling()
                        .labels_of_state(state_index)
                        .eq(result.labeling().labels_of_state(state_index))
                );
            }
        })
    }
}
