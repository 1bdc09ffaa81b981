use serde::Serialize;
use simple_counter::Address;

use crate::{cli::GetArgs, config::Settings, error::Result, session::Session};

#[derive(Debug, Serialize)]
struct ContractInfo<'a> {
    address: Address,
    friendly: String,
    id: u32,
    counter: u32,
    code: Option<&'a str>,
}

pub fn run(args: GetArgs, settings: &Settings) -> Result<()> {
    let mut session = Session::open(settings)?;
    let contract = session.open_contract(&args.address)?;
    let address = *contract.address();

    let id = contract.get_id(&mut session.chain)?;
    let counter = contract.get_counter(&mut session.chain)?;
    let info = ContractInfo {
        address,
        friendly: address.to_friendly(true, false),
        id,
        counter,
        code: session.chain.code_name(&address),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("address  {}", info.address);
        println!("friendly {}", info.friendly);
        println!("id       {}", info.id);
        println!("counter  {}", info.counter);
        println!("code     {}", info.code.unwrap_or("unknown"));
    }
    Ok(())
}
