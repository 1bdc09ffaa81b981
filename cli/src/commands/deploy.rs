use rand::Rng;
use simple_counter::{Provider, SimpleContract, SimpleContractConfig, BASECHAIN};
use simple_counter_sandbox::compile;

use crate::{
    cli::DeployArgs,
    config::Settings,
    error::Result,
    session::Session,
    ui,
};

pub fn run(args: DeployArgs, settings: &Settings) -> Result<()> {
    let mut session = Session::open(settings)?;
    let value = settings.value_or(args.value.as_deref())?;
    let id = args
        .id
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..10_000));
    let version = args.artifact.version();

    let contract = SimpleContract::create_from_config(
        &SimpleContractConfig {
            id,
            counter: args.counter,
        },
        compile(version.artifact())?,
        BASECHAIN,
    )?;
    let address = *contract.address();

    if session.chain.is_deployed(&address)? {
        ui::warn(format!("{address} is already deployed, nothing to do"));
        println!("{address}");
        return Ok(());
    }

    ui::status(format!("Deploying {version} to {address}"));
    let receipt = contract.send_deploy(&mut session.chain, &session.sender, value)?;
    session.save()?;
    session.check_receipt(&receipt, &address)?;

    settings.retry.wait_until("deploy", |_| {
        Ok(session.chain.is_deployed(&address)?.then_some(()))
    })?;

    let deployed_id = contract.get_id(&mut session.chain)?;
    ui::status(format!("ID {deployed_id}"));
    ui::success(format!(
        "Deployed {version} at {}",
        address.to_friendly(true, false)
    ));
    println!("{address}");
    Ok(())
}
