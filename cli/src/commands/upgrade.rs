use simple_counter::contract::{DecreaseOptions, UpgradeAllOptions, UpgradeOptions};
use simple_counter::upgrade::check_layout;
use simple_counter::{Address, Coins, ContractVersion, CounterState, SimpleContract};
use simple_counter_sandbox::compile;

use crate::{
    cli::UpgradeArgs,
    config::Settings,
    error::{CliError, Result},
    session::Session,
    ui,
};

pub fn run(args: UpgradeArgs, settings: &Settings) -> Result<()> {
    let mut session = Session::open(settings)?;
    let value = settings.value_or(args.value.as_deref())?;
    let contract = session.open_contract(&args.address)?;
    let address = *contract.address();
    let sender = session.sender;
    let version = args.artifact.version();
    let code = compile(version.artifact())?;

    let receipt = if args.all {
        let data = replacement_state(&mut session, &contract, &args, version)?;
        ui::status(format!("Upgrading {address} to {version} with new data"));
        contract.send_upgrade_all(
            &mut session.chain,
            &sender,
            UpgradeAllOptions {
                value,
                query_id: None,
                code,
                data: data.to_layout_cell(version.layout())?,
            },
        )?
    } else {
        ensure_layout(&session, &address, version, args.force)?;
        ui::status(format!("Upgrading {address} to {version}"));
        contract.send_upgrade(
            &mut session.chain,
            &sender,
            UpgradeOptions {
                value,
                query_id: None,
                code,
            },
        )?
    };
    session.save()?;
    session.check_receipt(&receipt, &address)?;

    ui::status("Waiting for contract to upgrade...");
    settings.retry.wait_until("upgrade", |_| {
        Ok((session.chain.code_name(&address) == Some(version.artifact())).then_some(()))
    })?;
    ui::success(format!("{address} now runs {version}"));

    if let Some(amount) = args.decrease_by {
        decrease(&mut session, &contract, amount, value)?;
    }
    Ok(())
}

/// State written by `--all`: flags first, then whatever the contract holds.
fn replacement_state(
    session: &mut Session,
    contract: &SimpleContract,
    args: &UpgradeArgs,
    version: ContractVersion,
) -> Result<CounterState> {
    let id = match args.id {
        Some(id) => id,
        None => contract.get_id(&mut session.chain)?,
    };
    let counter = match args.counter {
        Some(counter) => counter,
        None => contract.get_counter(&mut session.chain)?,
    };

    if !version.is_owner_gated() {
        if args.owner.is_some() {
            ui::warn(format!("{version} has no owner field, ignoring --owner"));
        }
        return Ok(CounterState::new(id, counter));
    }

    let owner = match args.owner.as_deref() {
        Some(owner) => session.resolve_account(owner)?,
        None => session.sender,
    };
    ui::status(format!("Owner set to {owner}"));
    Ok(CounterState::with_owner(id, counter, owner))
}

fn ensure_layout(
    session: &Session,
    address: &Address,
    version: ContractVersion,
    force: bool,
) -> Result<()> {
    let Some(data) = session.chain.data(address) else {
        return Err(CliError::NotDeployed(*address));
    };
    match check_layout(version, data) {
        Ok(_) => Ok(()),
        Err(source) if force => {
            ui::warn(format!(
                "{version} cannot read the current data cell ({source}), installing anyway"
            ));
            Ok(())
        }
        Err(source) => Err(CliError::LayoutMismatch { version, source }),
    }
}

fn decrease(
    session: &mut Session,
    contract: &SimpleContract,
    amount: u32,
    value: Coins,
) -> Result<()> {
    let address = *contract.address();
    let sender = session.sender;
    let before = contract.get_counter(&mut session.chain)?;

    let receipt = contract.send_decrease(
        &mut session.chain,
        &sender,
        DecreaseOptions {
            value,
            decrease_by: amount,
            query_id: None,
        },
    )?;
    session.save()?;
    session.check_receipt(&receipt, &address)?;

    let retry = session.settings().retry;
    let after = if amount == 0 {
        before
    } else {
        retry.wait_until("counter change", |_| {
            let current = contract.get_counter(&mut session.chain)?;
            Ok((current != before).then_some(current))
        })?
    };
    ui::success(format!("Counter decreased successfully: {before} -> {after}"));
    println!("{after}");
    Ok(())
}
