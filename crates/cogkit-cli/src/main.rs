use std::process::ExitCode;

use cogkit_core::CogError;

#[tokio::main]
async fn main() -> ExitCode {
    match cogkit_cli::run(std::env::args_os()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match &err {
                CogError::Render(render_err) => eprintln!("{}", render_err.user_message()),
                CogError::UsageError(msg) => eprintln!("{msg}"),
                other => eprintln!("error: {other}"),
            }
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}
