use clap::Subcommand;

use super::config::ConfigArgs;
use super::inject::InjectArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the review backend (`POST /review`)
    Serve(ServeArgs),

    /// Mount the review control into a simulated merge request page and drive it
    Inject(InjectArgs),

    /// Inspect or edit the configuration file
    Config(ConfigArgs),
}
