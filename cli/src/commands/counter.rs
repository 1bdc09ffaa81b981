use simple_counter::contract::{DecreaseOptions, IncreaseOptions};

use crate::{
    cli::CounterArgs,
    config::Settings,
    error::Result,
    session::Session,
    ui,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

pub fn run(args: CounterArgs, direction: Direction, settings: &Settings) -> Result<()> {
    let mut session = Session::open(settings)?;
    let value = settings.value_or(args.value.as_deref())?;
    let contract = session.open_contract(&args.address)?;
    let address = *contract.address();
    let sender = session.sender;

    let before = contract.get_counter(&mut session.chain)?;
    let receipt = match direction {
        Direction::Increase => contract.send_increase(
            &mut session.chain,
            &sender,
            IncreaseOptions {
                value,
                increase_by: args.amount,
                query_id: args.query_id,
            },
        )?,
        Direction::Decrease => contract.send_decrease(
            &mut session.chain,
            &sender,
            DecreaseOptions {
                value,
                decrease_by: args.amount,
                query_id: args.query_id,
            },
        )?,
    };
    session.save()?;
    session.check_receipt(&receipt, &address)?;

    let verb = match direction {
        Direction::Increase => "increase",
        Direction::Decrease => "decrease",
    };

    // A zero amount (or a full wrap) leaves the counter where it was.
    let after = if args.no_wait || args.amount == 0 {
        contract.get_counter(&mut session.chain)?
    } else {
        ui::status(format!("Waiting for counter to {verb}..."));
        settings.retry.wait_until("counter change", |attempt| {
            if attempt > 1 && settings.verbose {
                ui::status(format!("Attempt {attempt}"));
            }
            let current = contract.get_counter(&mut session.chain)?;
            Ok((current != before).then_some(current))
        })?
    };

    ui::success(format!("Counter {verb}d successfully: {before} -> {after}"));
    println!("{after}");
    Ok(())
}
