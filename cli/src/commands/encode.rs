use simple_counter::{CounterState, Operation};
use simple_counter_sandbox::compile;

use crate::{
    cli::{EncodeArgs, EncodeOperation},
    error::Result,
    session::parse_address,
    ui,
};

pub fn run(args: EncodeArgs, verbose: bool) -> Result<()> {
    let operation = build(args.operation, args.query_id)?;
    let body = operation.encode()?;

    if verbose {
        ui::status(format!(
            "{} body, {} bits, {} refs",
            operation.kind(),
            body.bit_len(),
            body.references().len()
        ));
        eprint!("{body}");
    }
    println!("{}", hex::encode(body.to_boc()));
    Ok(())
}

fn build(operation: EncodeOperation, query_id: u64) -> Result<Operation> {
    Ok(match operation {
        EncodeOperation::Deploy => Operation::Deploy,
        EncodeOperation::Increase { amount } => Operation::Increase {
            query_id,
            increase_by: amount,
        },
        EncodeOperation::Decrease { amount } => Operation::Decrease {
            query_id,
            decrease_by: amount,
        },
        EncodeOperation::Upgrade { artifact } => Operation::UpgradeCode {
            query_id,
            code: compile(artifact.version().artifact())?,
        },
        EncodeOperation::UpgradeAll {
            artifact,
            id,
            counter,
            owner,
        } => {
            let state = match owner.as_deref() {
                Some(owner) => CounterState::with_owner(id, counter, parse_address(owner)?),
                None => CounterState::new(id, counter),
            };
            let version = artifact.version();
            Operation::UpgradeCodeAndData {
                query_id,
                code: compile(version.artifact())?,
                data: state.to_layout_cell(version.layout())?,
            }
        }
    })
}
