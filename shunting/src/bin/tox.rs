mod repl {
    use shunting::{MathContext, MathError};

    fn statement(cx: &MathContext, input: &str) -> Result<String, MathError> {
        let statement = cx.parse(input)?;
        if statement.is_function_definition() {
            return Ok(format!("{}", statement));
        }
        let result = cx.eval(&statement)?;
        let decimals = cx.settings.decimals;
        Ok(format!("{} = {}", cx.render(&statement.rpn), result.value.format(decimals)))
    }

    pub fn evalexpr(cx: &MathContext, input: &str) {
        match input.trim() {
            "" => return,
            ":clear" => return cx.clear(),
            _ => (),
        }
        match statement(cx, input) {
            Err(e) => println!("Error: {}", e),
            Ok(output) => println!("{}", output),
        }
    }
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cx = shunting::MathContext::with_settings(shunting::Settings::from_env());

    if std::env::args().len() > 1 {
        let input = std::env::args().skip(1).collect::<Vec<String>>().join(" ");
        repl::evalexpr(&cx, &input);
        return Ok(());
    }

    use rustyline::error::ReadlineError;
    let history = dirs::home_dir().map(|home| home.join(".tox_history"));
    let mut rl = rustyline::DefaultEditor::new().map_err(|e| e.to_string())?;
    if let Some(path) = &history {
        if rl.load_history(path).is_err() {
            log::debug!("no history at {}", path.display());
        }
    }
    loop {
        match rl.readline(">> ") {
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(format!("Readline err: {:?}", e)),
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                repl::evalexpr(&cx, &line);
            },
        }
    }
    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            log::warn!("could not save history: {}", e);
        }
    }
    Ok(())
}
