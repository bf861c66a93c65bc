//! Snippet tests for the parley compiler pipeline as a whole.

use std::{collections::HashMap, fs, path::PathBuf, rc::Rc};

use parley::{
    common::{source::Source, span::Span},
    compiler,
    construct::term::Term,
    Value, VM,
};

/// Represents specific success/failure modes of a snippet test.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Syntax,
    Trace,
}

impl Outcome {
    pub fn parse(outcome: &str) -> Outcome {
        match outcome {
            "success" => Outcome::Success,
            "syntax" => Outcome::Syntax,
            "trace" => Outcome::Trace,
            invalid => {
                println!("invalid: '{}'", invalid);
                panic!("invalid outcome in strat heading");
            },
        }
    }
}

/// Represents what part of the compiler a snippet tests.
#[derive(Debug)]
pub enum Action {
    Read,
    Compile,
    Run,
}

impl Action {
    pub fn parse(action: &str) -> Action {
        match action {
            "read" => Action::Read,
            "compile" => Action::Compile,
            "run" => Action::Run,
            invalid => {
                println!("invalid: '{}'", invalid);
                panic!("invalid action in strat heading");
            },
        }
    }
}

/// Represents a test strategy for executing a snippet,
/// Found at the top of each file.
#[derive(Debug)]
pub struct TestStrat {
    /// How to run the test.
    action: Action,
    /// The expected outcome.
    outcome: Outcome,
    /// Optional value to check against the top of the stack.
    /// Should only be used with Action::Run
    expect: Option<Value>,
}

impl TestStrat {
    /// Uses a heading to construct a test strat
    pub fn heading(heading: HashMap<String, String>) -> TestStrat {
        let mut outcome = None;
        let mut action = None;
        let mut expect = None;

        for (strat, result) in heading.iter() {
            match strat.as_str() {
                "outcome" => outcome = Some(Outcome::parse(result)),
                "action" => action = Some(Action::parse(result)),
                "expect" => {
                    let source = Source::source(result);
                    let term = compiler::read(&Span::whole(&source)).expect("Could not read expectation");
                    expect = match term.item {
                        Term::Lit(value) => Some(value),
                        other => panic!("expected a literal, found {}", other),
                    };
                },
                invalid => {
                    println!("invalid: '{}'", invalid);
                    panic!("invalid strat in strat heading");
                },
            }
        }

        TestStrat {
            outcome: outcome.expect("no outcome provided"),
            action: action.expect("no action provided"),
            expect,
        }
    }

    /// Splits a snippet into its test strat and the source under test.
    /// The strat is the run of `%` lines at the top of the file.
    pub fn snippet(source: &Rc<Source>) -> (TestStrat, Rc<Source>) {
        let mut heading = HashMap::new();
        let mut body = 0;

        // build up a list of key-value pairs
        for line in source.contents.lines() {
            let Some(strat) = line.strip_prefix('%') else { break };

            let (key, value) = strat.split_once(':').expect("Missing colon in test strat heading");
            if heading.insert(key.trim().to_string(), value.trim().to_string()).is_some() {
                panic!("Key present twice in test strat heading");
            }
            body += line.len() + 1;
        }

        let rest = source.contents.get(body..).unwrap_or("");
        (TestStrat::heading(heading), Source::new(rest, &source.path))
    }
}

fn test_snippet(source: Rc<Source>, strat: TestStrat) {
    let actual_outcome = match strat.action {
        Action::Read => match compiler::read(&Span::whole(&source)) {
            Ok(_) => Outcome::Success,
            Err(e) => {
                println!("{}", e);
                Outcome::Syntax
            },
        },

        Action::Compile => match compiler::compile(&source) {
            Ok(_) => Outcome::Success,
            Err(e) => {
                println!("{}", e);
                Outcome::Syntax
            },
        },

        Action::Run => match compiler::compile(&source) {
            Ok(program) => {
                let mut vm = VM::init(program, ());

                match vm.run() {
                    Ok(_) => {
                        if let Some(expected) = &strat.expect {
                            let top = vm.stack().last().expect("Stack is empty");
                            if expected != top {
                                println!("Top: {:?}", top);
                                println!("Expected: {:?}", expected);
                                panic!("Top stack value does not match")
                            }
                        }
                        Outcome::Success
                    },
                    Err(e) => {
                        println!("{}", e);
                        Outcome::Trace
                    },
                }
            },
            Err(e) => {
                println!("{}", e);
                Outcome::Syntax
            },
        },
    };

    if actual_outcome != strat.outcome {
        println!("expected outcome {:?}", strat.outcome);
        println!("actual outcome {:?}", actual_outcome);
        panic!("test failed, outcomes are not the same");
    }
}

#[test]
fn test_snippets() {
    let paths = fs::read_dir("./tests/snippets")
        .expect("You must be in the base parley directory, snippets in ./tests/snippets");

    let mut to_run: Vec<PathBuf> = vec![];
    for path in paths {
        to_run.push(path.expect("Could not read path").path())
    }
    to_run.sort();

    println!("\nRunning {} snippet test(s)...", to_run.len());

    for (counter, path) in to_run.iter().enumerate() {
        println!("test {}: {}...", counter, path.display());

        let source = Source::path(path).expect("Could not get snippet source");
        let (test_strat, source) = TestStrat::snippet(&source);

        test_snippet(source, test_strat);
    }

    println!("All tests passed!\n");
}
