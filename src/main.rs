//
// ql-label preview --text "Hello" --output label.png
// ql-label print --text "Hello" --printer tcp://192.168.0.23:9100 --model QL-820NWB
//
use clap::{Args, Parser, Subcommand};
use log::{debug, error, info, LevelFilter};
use std::path::PathBuf;
use std::process;

use ql_label::{
    render_label, resolve, transport, Error, FontCatalog, LabelTable, Model, Orientation,
    RenderRequest, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "ql-label", about = "Print text labels on Brother QL label printers")]
struct Cli {
    /// Log level (error, warn, info, debug, trace), overrides RUST_LOG
    #[arg(long)]
    loglevel: Option<String>,

    /// Folder with additional .ttf/.otf fonts
    #[arg(long)]
    font_folder: Option<PathBuf>,

    /// Label size inserted in your printer
    #[arg(long)]
    default_label_size: Option<String>,

    /// Label orientation used when a request does not give one
    #[arg(long, value_parser = ["standard", "rotated"])]
    default_orientation: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a label into a PNG file
    Preview {
        #[command(flatten)]
        label: LabelArgs,

        #[arg(short, long, default_value = "label.png")]
        output: PathBuf,
    },
    /// Render a label and send it to the printer
    Print {
        #[command(flatten)]
        label: LabelArgs,

        /// Printer descriptor like tcp://192.168.0.23:9100, file:///dev/usb/lp0 or usb://SERIAL
        #[arg(long)]
        printer: Option<String>,

        /// Printer model, e.g. QL-800
        #[arg(long)]
        model: Option<String>,

        /// Do not cut the label after printing
        #[arg(long)]
        no_cut: bool,

        /// Compress raster lines
        #[arg(long)]
        compress: bool,

        /// Print 600 dpi along the feed axis
        #[arg(long)]
        high_resolution: bool,
    },
    /// List the supported label sizes
    Labels,
    /// List the available fonts
    Fonts,
}

#[derive(Args, Debug)]
struct LabelArgs {
    /// Label text, `\n` separates lines
    #[arg(short, long)]
    text: Option<String>,

    /// Font as "Family (Style)"
    #[arg(long)]
    font: Option<String>,

    #[arg(long)]
    font_size: Option<String>,

    #[arg(long)]
    label_size: Option<String>,

    /// Kept for older clients, has no effect on the layout
    #[arg(long)]
    margin: Option<String>,

    /// Darkness threshold in percent
    #[arg(long)]
    threshold: Option<String>,

    /// left, center or right
    #[arg(long)]
    align: Option<String>,

    /// standard or rotated
    #[arg(long)]
    orientation: Option<String>,

    /// Margins in percent of the font size
    #[arg(long)]
    margin_top: Option<String>,
    #[arg(long)]
    margin_bottom: Option<String>,
    #[arg(long)]
    margin_left: Option<String>,
    #[arg(long)]
    margin_right: Option<String>,
}

impl LabelArgs {
    fn request(&self) -> RenderRequest {
        let request = RenderRequest {
            text: self.text.as_ref().map(|text| text.replace("\\n", "\n")),
            font_size: self.font_size.clone(),
            label_size: self.label_size.clone(),
            margin: self.margin.clone(),
            threshold: self.threshold.clone(),
            align: self.align.clone(),
            orientation: self.orientation.clone(),
            margin_top: self.margin_top.clone(),
            margin_bottom: self.margin_bottom.clone(),
            margin_left: self.margin_left.clone(),
            margin_right: self.margin_right.clone(),
            ..RenderRequest::default()
        };
        match &self.font {
            Some(font) => request.with_combined_font(font),
            None => request,
        }
    }
}

fn init_logger(level: Option<&str>) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "[{}:{}] {} - {}",
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.level(),
            record.args()
        )
    });
    if let Some(level) = level {
        match level.parse::<LevelFilter>() {
            Ok(level) => {
                builder.filter_level(level);
            }
            Err(_) => eprintln!("ignoring unknown log level {:?}", level),
        }
    }
    builder.init();
}

fn settings(cli: &Cli) -> Result<Settings, Error> {
    let mut settings = Settings::from_env()?;
    if let Some(folder) = &cli.font_folder {
        settings = settings.with_font_folder(folder);
    }
    if let Some(size) = &cli.default_label_size {
        settings = settings.with_default_label_size(size);
    }
    if let Some(orientation) = &cli.default_orientation {
        settings = settings.with_default_orientation(orientation.parse::<Orientation>()?);
    }
    Ok(settings)
}

fn load_fonts(settings: &Settings) -> Result<FontCatalog, Error> {
    let mut fonts = FontCatalog::system();
    debug!("Found {} system font families", fonts.families().count());
    if let Some(folder) = settings.font_folder() {
        fonts.merge(FontCatalog::load_dir(folder)?);
    }
    Ok(fonts)
}

fn run(cli: Cli) -> Result<(), Error> {
    let labels = LabelTable::builtin();
    let settings = settings(&cli)?;
    settings.validate(&labels)?;

    match &cli.command {
        Command::Labels => {
            for label in labels.iter() {
                println!(
                    "{:<8} {:<14} {:>5} x {:<5} {}",
                    label.id,
                    label.class.to_string(),
                    label.printable_width,
                    label.printable_height,
                    label.name
                );
            }
            return Ok(());
        }
        Command::Fonts => {
            let fonts = load_fonts(&settings)?;
            for family in fonts.families() {
                for style in fonts.styles(family) {
                    println!("{} ({})", family, style);
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let fonts = load_fonts(&settings)?;
    if fonts.is_empty() {
        return Err(Error::InvalidConfig(
            "not a single font was found, install some or use --font-folder".to_string(),
        ));
    }
    let settings = settings.fallback_font(&fonts)?;

    match cli.command {
        Command::Preview { label, output } => {
            let context = resolve(&label.request(), &fonts, &labels, &settings)?;
            let rendered = render_label(&context)?;
            rendered.image.save(&output)?;
            info!("Saved preview to {:?}", output);
        }
        Command::Print {
            label,
            printer,
            model,
            no_cut,
            compress,
            high_resolution,
        } => {
            let model = match model {
                Some(model) => model.parse::<Model>()?,
                None => settings.model(),
            };
            let printer = printer.unwrap_or_else(|| settings.printer().to_string());

            let context = resolve(&label.request(), &fonts, &labels, &settings)?;
            let rendered = render_label(&context)?;
            let options = rendered
                .print_options()
                .cut(!no_cut)
                .compress(compress)
                .high_resolution(high_resolution);
            let job = rendered.encode(model, options)?;

            let mut transport = transport::open(&printer, model)?;
            transport.send(&job)?;
            info!("Printed label {} on {} ({})", rendered.label.id, printer, model);
        }
        Command::Labels | Command::Fonts => {}
    }
    Ok(())
}

fn main() {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logger(cli.loglevel.as_deref());

    if let Err(err) = run(cli) {
        error!("{}", err);
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
