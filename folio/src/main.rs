use clap::{arg, command, crate_name, Command};
use client::UploadParams;

mod cli;

#[tokio::main]
async fn main() {
    let cli = command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(Command::new(cli::SERVER_SUBCOMMAND).about(cli::SERVER_DESCRIPTION))
        .subcommand(
            Command::new(cli::FOLDER_SUBCOMMAND)
                .about(cli::FOLDER_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Folio server URI"))
                .subcommand(Command::new(cli::LIST_SUBCOMMAND).about(cli::FOLDER_LIST_DESCRIPTION))
                .subcommand(
                    Command::new(cli::CREATE_SUBCOMMAND)
                        .about(cli::FOLDER_CREATE_DESCRIPTION)
                        .arg(arg!(-n --name <NAME>).required(true).help("Folder name")),
                ),
        )
        .subcommand(
            Command::new(cli::FILE_SUBCOMMAND)
                .about(cli::FILE_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Folio server URI"))
                .subcommand(
                    Command::new(cli::LIST_SUBCOMMAND)
                        .about(cli::FILE_LIST_DESCRIPTION)
                        .arg(
                            arg!(-d --folder <ID>)
                                .required(false)
                                .help("Restrict the listing to one folder"),
                        ),
                )
                .subcommand(
                    Command::new(cli::UPLOAD_SUBCOMMAND)
                        .about(cli::FILE_UPLOAD_DESCRIPTION)
                        .arg(
                            arg!(-f --file <FILE>)
                                .required(true)
                                .help("Path to file to upload"),
                        )
                        .arg(
                            arg!(-d --folder <ID>)
                                .required(false)
                                .help("Folder to put the file into"),
                        )
                        .arg(
                            arg!(-n --name <NAME>)
                                .required(false)
                                .help("Display name override"),
                        ),
                ),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
        .get_matches();

    if cli.subcommand_matches(cli::VERSION_SUBCOMMAND).is_some() {
        cli::version::run();
    } else if cli.subcommand_matches(cli::BUGREPORT_SUBCOMMAND).is_some() {
        cli::bugreport::run();
    } else if cli.subcommand_matches(cli::SERVER_SUBCOMMAND).is_some() {
        server::run().await;
    } else if let Some(folder_matches) = cli.subcommand_matches(cli::FOLDER_SUBCOMMAND) {
        let uri = folder_matches.get_one::<String>("uri").unwrap();
        if folder_matches
            .subcommand_matches(cli::LIST_SUBCOMMAND)
            .is_some()
        {
            cli::client::list_folders(uri).await;
        } else if let Some(create_matches) =
            folder_matches.subcommand_matches(cli::CREATE_SUBCOMMAND)
        {
            let name = create_matches.get_one::<String>("name").unwrap();
            cli::client::create_folder(uri, name).await;
        }
    } else if let Some(file_matches) = cli.subcommand_matches(cli::FILE_SUBCOMMAND) {
        let uri = file_matches.get_one::<String>("uri").unwrap();
        if let Some(list_matches) = file_matches.subcommand_matches(cli::LIST_SUBCOMMAND) {
            let folder = list_matches
                .get_one::<String>("folder")
                .and_then(|id| id.parse().ok());
            cli::client::list_files(uri, folder).await;
        } else if let Some(upload_matches) = file_matches.subcommand_matches(cli::UPLOAD_SUBCOMMAND)
        {
            let file = upload_matches.get_one::<String>("file").unwrap();
            let folder = upload_matches
                .get_one::<String>("folder")
                .and_then(|id| id.parse().ok());
            let display_name = upload_matches.get_one::<String>("name").cloned();
            let params = UploadParams {
                uri: uri.clone(),
                file: file.clone(),
                folder,
                display_name,
            };
            cli::client::upload_single_file(params).await;
        }
    }
}
