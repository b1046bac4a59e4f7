use clap::{Parser, Subcommand};
use cropkit::batch::{self, BatchOptions};
use cropkit::config::{self, ToolConfig};
use cropkit::imaging::{
    AspectRatio, ColorAdjustments, CropRegion, FilterPreset, FilterSettings, FormatKind, MIN_ZOOM,
    OutputFormat, OverlayPosition, ResampleFilter, RustBackend, ScaleTier, TextMark,
    WatermarkParams,
};
use cropkit::session::{CropSession, ToolState};
use cropkit::{FileInput, export, output, tools};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cropkit")]
#[command(version)]
#[command(about = "Crop, resize and touch up images locally")]
#[command(long_about = "\
Crop, resize and touch up images locally

Every command loads one image, applies one operation and writes one file
into the output directory:

  crop       → cropped-resized-image.png
  adjust     → edited-image.{png,jpg,webp}
  filter     → filtered-image.{png,jpg,webp}
  remove-bg  → processed-image.{png,jpg,webp}   (channel average, not segmentation)
  watermark  → watermarked-image.{png,jpg,webp}  (image or text mark)
  convert    → <name>.{png,jpg,webp}             (never over its input without --force)
  batch      → one file per input, mirroring the input tree

--format original keeps the input's format where it can be written
(JPEG, PNG, WebP) and falls back to PNG otherwise.

Settings are read from ./cropkit.toml when present. Run 'cropkit gen-config'
to print a documented one. Set RUST_LOG=debug for diagnostics.")]
struct Cli {
    /// Config file (defaults to ./cropkit.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = ".", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Output format flags shared by the color tools.
#[derive(clap::Args, Clone)]
struct FormatArgs {
    /// png, jpeg, webp or original
    #[arg(long, default_value = "png")]
    format: FormatKind,

    /// JPEG quality 1-100 (defaults to export.jpeg_quality)
    #[arg(long)]
    quality: Option<u32>,
}

impl FormatArgs {
    fn resolve(&self, config: &ToolConfig, input: &FileInput) -> OutputFormat {
        self.format.resolve(
            self.quality.unwrap_or(config.export.jpeg_quality),
            input.declared_type.as_deref(),
        )
    }
}

#[derive(Subcommand)]
enum Command {
    /// Crop a region and resample it to an exact size
    Crop {
        file: PathBuf,

        /// Explicit crop rectangle in source pixels
        #[arg(long, value_name = "X,Y,W,H", conflicts_with_all = ["aspect", "zoom", "center"])]
        crop: Option<CropRegion>,

        /// Cropper aspect: free, 1:1, 4:3, 16:9
        #[arg(long)]
        aspect: Option<AspectRatio>,

        /// Cropper zoom, 1.0-3.0
        #[arg(long)]
        zoom: Option<f64>,

        /// View centre in source pixels
        #[arg(long, value_name = "X,Y", value_parser = parse_center)]
        center: Option<(f64, f64)>,

        /// Output width (height follows when the aspect lock is on)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (width follows when the aspect lock is on)
        #[arg(long)]
        height: Option<u32>,

        /// Don't keep the output in the source's aspect ratio
        #[arg(long)]
        no_lock: bool,

        /// Resampling filter (defaults to resample.filter)
        #[arg(long)]
        filter: Option<ResampleFilter>,
    },
    /// Adjust brightness, contrast, saturation (percent) and hue (degrees)
    Adjust {
        file: PathBuf,
        #[arg(long, default_value_t = 100)]
        brightness: u32,
        #[arg(long, default_value_t = 100)]
        contrast: u32,
        #[arg(long, default_value_t = 100)]
        saturation: u32,
        #[arg(long, default_value_t = 0.0)]
        hue: f32,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Apply a preset look plus signed slider offsets (-100..100)
    Filter {
        file: PathBuf,
        /// none, grayscale, sepia, vivid, vintage, dramatic
        #[arg(long, default_value = "none")]
        preset: FilterPreset,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        brightness: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        contrast: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        saturation: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        temperature: i32,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Replace every pixel with the average of its color channels
    RemoveBg {
        file: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Stamp a graphic or text mark onto an image
    #[command(group(clap::ArgGroup::new("stamp").required(true).args(["mark", "text"])))]
    Watermark {
        file: PathBuf,
        /// Mark image
        #[arg(long)]
        mark: Option<PathBuf>,
        /// Mark text, drawn in white DejaVu Sans
        #[arg(long)]
        text: Option<String>,
        /// Text size in pixels
        #[arg(long, default_value_t = 24.0, requires = "text")]
        font_size: f32,
        /// top-left ... bottom-right; repeat for several
        #[arg(long = "position", default_value = "bottom-right")]
        positions: Vec<OverlayPosition>,
        /// 0-100
        #[arg(long, default_value_t = 50)]
        opacity: u8,
        /// Mark width relative to the shorter image side
        #[arg(long, default_value_t = 0.2)]
        scale: f32,
        /// png, jpeg, webp or original
        #[arg(long, default_value = "png")]
        format: FormatKind,
    },
    /// Convert to PNG, JPEG or WebP
    Convert {
        file: PathBuf,
        /// png, jpeg, webp or original
        #[arg(long)]
        to: FormatKind,
        /// JPEG quality 1-100
        #[arg(long, default_value_t = tools::CONVERT_JPEG_QUALITY)]
        quality: u32,
        /// PNG scale: high, medium, low
        #[arg(long, default_value = "high")]
        tier: ScaleTier,
        /// Write even when the output is the input file
        #[arg(long)]
        force: bool,
    },
    /// Fit every image under a directory into WxH
    Batch {
        dir: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// png, jpeg, webp or original
        #[arg(long, default_value = "png")]
        to: FormatKind,
        /// JPEG quality (defaults to export.jpeg_quality)
        #[arg(long)]
        quality: Option<u32>,
    },
    /// Print a stock cropkit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let command = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        command => command,
    };

    let config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(Path::new("."))?,
    };
    let backend = RustBackend::with_filter(config.resample.filter);

    match command {
        Command::Crop {
            file,
            crop,
            aspect,
            zoom,
            center,
            width,
            height,
            no_lock,
            filter,
        } => {
            let filter = filter.unwrap_or(config.resample.filter);
            let mut session = CropSession::with_defaults(
                RustBackend::with_filter(filter),
                config.default_output(),
                filter,
            );
            let pending = session.load_in_background(FileInput::from_path(&file)?)?;
            session.complete_load(pending.wait())?;

            if no_lock {
                session.set_maintain_aspect(false);
            }
            match (width, height) {
                (Some(w), Some(h)) => session.set_output_size(w, h),
                (Some(w), None) => session.set_output_width(w),
                (None, Some(h)) => session.set_output_height(h),
                (None, None) => {}
            }
            match crop {
                Some(region) => session.adjust_crop(region),
                None => session.set_crop_view(
                    aspect.unwrap_or_default(),
                    zoom.unwrap_or(MIN_ZOOM),
                    center,
                ),
            }

            if session.apply()? != ToolState::Rendered {
                return Err("nothing to render".into());
            }
            let saved = session.download(&cli.output)?;
            if let (Some(source), Some(crop), Some(result)) =
                (session.source(), session.crop(), session.result())
            {
                output::print_crop_report(source, crop, result, saved.as_deref());
            }
        }
        Command::Adjust {
            file,
            brightness,
            contrast,
            saturation,
            hue,
            format,
        } => {
            let adjustments = ColorAdjustments {
                brightness,
                contrast,
                saturation,
                hue,
            };
            let input = FileInput::from_path(&file)?;
            let artifact = tools::adjust_colors(
                &backend,
                &input,
                &adjustments,
                format.resolve(&config, &input),
            )?;
            let saved = artifact.save(&cli.output)?;
            output::print_artifact(&artifact, &saved);
        }
        Command::Filter {
            file,
            preset,
            brightness,
            contrast,
            saturation,
            temperature,
            format,
        } => {
            let settings = FilterSettings {
                brightness,
                contrast,
                saturation,
                temperature,
                preset,
            };
            let input = FileInput::from_path(&file)?;
            let artifact = tools::apply_filters(
                &backend,
                &input,
                &settings,
                format.resolve(&config, &input),
            )?;
            let saved = artifact.save(&cli.output)?;
            output::print_artifact(&artifact, &saved);
        }
        Command::RemoveBg { file, format } => {
            let input = FileInput::from_path(&file)?;
            let artifact =
                tools::average_channels(&backend, &input, format.resolve(&config, &input))?;
            let saved = artifact.save(&cli.output)?;
            output::print_artifact(&artifact, &saved);
        }
        Command::Watermark {
            file,
            mark,
            text,
            font_size,
            positions,
            opacity,
            scale,
            format,
        } => {
            let params = WatermarkParams {
                positions,
                opacity: opacity.min(100),
                scale,
                ..WatermarkParams::default()
            };
            let input = FileInput::from_path(&file)?;
            let format = format.resolve(
                tools::WATERMARK_JPEG_QUALITY,
                input.declared_type.as_deref(),
            );
            let artifact = match (mark, text) {
                (Some(mark), _) => tools::watermark(
                    &backend,
                    &input,
                    &FileInput::from_path(&mark)?,
                    &params,
                    format,
                )?,
                (None, Some(text)) => tools::watermark_text(
                    &backend,
                    &input,
                    &TextMark::new(text, font_size),
                    &params,
                    format,
                )?,
                (None, None) => return Err("a --mark image or --text is required".into()),
            };
            let saved = artifact.save(&cli.output)?;
            output::print_artifact(&artifact, &saved);
        }
        Command::Convert {
            file,
            to,
            quality,
            tier,
            force,
        } => {
            batch::check_size(&file, config.input.max_file_size)?;
            let input = FileInput::from_path(&file)?;
            let artifact = tools::convert(
                &backend,
                &input,
                to.resolve(quality, input.declared_type.as_deref()),
                tier,
            )?;
            if !force {
                export::refuse_overwrite(&cli.output.join(&artifact.file_name), &file)?;
            }
            let saved = artifact.save(&cli.output)?;
            output::print_artifact(&artifact, &saved);
        }
        Command::Batch {
            dir,
            width,
            height,
            to,
            quality,
        } => {
            init_thread_pool(&config.processing);
            let options = BatchOptions {
                bounds: (width.max(1), height.max(1)),
                format: to,
                quality: quality.unwrap_or(config.export.jpeg_quality),
                max_file_size: config.input.max_file_size,
            };
            let (tx, rx) = std::sync::mpsc::channel();
            let (input_root, output_root) = (dir.clone(), cli.output.clone());
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event, &input_root, &output_root) {
                        println!("{}", line);
                    }
                }
            });
            let summary = batch::run_batch(&backend, &dir, &cli.output, &options, Some(tx))?;
            printer.join().ok();
            output::print_batch_summary(&summary);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Parse a view centre given as `X,Y`.
fn parse_center(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("expected X,Y, got {s:?}"))
    };
    Ok((parse(x)?, parse(y)?))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
