use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gis_measure_core::{
    metrics, AreaUnit, ContextMenuItem, DisplayUnit, DisplayUnits, EngineConfig, GeometryKind,
    InteractionController, LengthUnit, MapCoordinate, MeasureGeometry, MeasurementSession,
    MetricMode, PointerButton, ProjectionCode, SessionSnapshot,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "gis-measure")]
#[command(about = "Length and area measurement on map coordinates")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the length of a line.
    Length {
        #[arg(long, default_value = "EPSG:3857")]
        projection: ProjectionCode,
        #[arg(long, default_value = "km")]
        unit: LengthUnit,
        #[arg(long, default_value = "planar")]
        mode: MetricMode,
        #[arg(value_name = "X,Y", required = true, allow_hyphen_values = true)]
        points: Vec<MapCoordinate>,
    },
    /// Print the area of a polygon.
    Area {
        #[arg(long, default_value = "EPSG:3857")]
        projection: ProjectionCode,
        #[arg(long, default_value = "km²")]
        unit: AreaUnit,
        #[arg(long, default_value = "planar")]
        mode: MetricMode,
        #[arg(value_name = "X,Y", required = true, allow_hyphen_values = true)]
        points: Vec<MapCoordinate>,
    },
    /// Print the unit table as JSON.
    Units,
    /// Drive a session with a JSON script and print the final state.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "EPSG:3857")]
        projection: ProjectionCode,
    },
    /// Print CLI version.
    Version,
}

/// One step of a replay script
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ScriptAction {
    Start {
        kind: GeometryKind,
    },
    Click {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Option<PointerButton>,
    },
    Move {
        x: f64,
        y: f64,
    },
    DoubleClick {
        x: f64,
        y: f64,
    },
    RightClick {
        x: f64,
        y: f64,
    },
    DragStart {
        x: f64,
        y: f64,
    },
    Drag {
        x: f64,
        y: f64,
    },
    DragEnd {
        x: f64,
        y: f64,
    },
    Menu {
        item: ContextMenuItem,
    },
    Finish,
    Cancel,
    ClearLines,
    ClearAreas,
    ClearAll,
    Exit,
    SetUnit {
        kind: GeometryKind,
        unit: String,
    },
}

#[derive(Debug, Serialize)]
struct UnitEntry {
    name: &'static str,
    scale: f64,
}

#[derive(Debug, Serialize)]
struct UnitTable {
    length: Vec<UnitEntry>,
    area: Vec<UnitEntry>,
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    #[serde(flatten)]
    snapshot: SessionSnapshot,
    context_menu: bool,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Length {
            projection,
            unit,
            mode,
            points,
        } => {
            let units = DisplayUnits {
                length: unit,
                ..DisplayUnits::default()
            };
            println!("{}", measure(MeasureGeometry::line(points), projection, mode, units));
            Ok(())
        }
        Commands::Area {
            projection,
            unit,
            mode,
            points,
        } => {
            let units = DisplayUnits {
                area: unit,
                ..DisplayUnits::default()
            };
            println!("{}", measure(MeasureGeometry::polygon(points), projection, mode, units));
            Ok(())
        }
        Commands::Units => run_units(),
        Commands::Replay {
            script,
            config,
            projection,
        } => run_replay(&script, config.as_deref(), projection),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn measure(
    geometry: MeasureGeometry,
    projection: ProjectionCode,
    mode: MetricMode,
    units: DisplayUnits,
) -> String {
    let value = metrics::measure(&geometry, &projection, mode);
    log::debug!("{} in {} ({:?}): {}", geometry.kind(), projection, mode, value);
    units.format(geometry.kind(), value)
}

fn run_units() -> Result<()> {
    let table = UnitTable {
        length: LengthUnit::ALL
            .iter()
            .map(|unit| UnitEntry {
                name: unit.label(),
                scale: unit.scale(),
            })
            .collect(),
        area: AreaUnit::ALL
            .iter()
            .map(|unit| UnitEntry {
                name: unit.label(),
                scale: unit.scale(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&table)?;
    println!("{json}");

    Ok(())
}

fn run_replay(script: &Path, config: Option<&Path>, projection: ProjectionCode) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let source = fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let actions: Vec<ScriptAction> = serde_json::from_str(&source)
        .with_context(|| format!("invalid script {}", script.display()))?;

    let mut controller =
        InteractionController::new(MeasurementSession::with_projection(config, projection));

    for (step, action) in actions.into_iter().enumerate() {
        log::debug!("step {}: {:?}", step + 1, action);
        apply(&mut controller, action).with_context(|| format!("script step {}", step + 1))?;
    }

    let output = ReplayOutput {
        snapshot: controller.session().snapshot(),
        context_menu: controller.context_menu().is_some(),
    };
    let json = serde_json::to_string_pretty(&output)?;
    println!("{json}");

    Ok(())
}

fn apply(controller: &mut InteractionController, action: ScriptAction) -> Result<()> {
    let at = MapCoordinate::new;

    match action {
        ScriptAction::Start { kind } => controller.start_measurement(kind),
        ScriptAction::Click { x, y, button } => {
            controller.click(at(x, y), button.unwrap_or(PointerButton::Left))
        }
        ScriptAction::Move { x, y } => controller.pointer_move(at(x, y)),
        ScriptAction::DoubleClick { x, y } => controller.double_click(at(x, y)),
        ScriptAction::RightClick { x, y } => {
            controller.open_context_menu(at(x, y));
        }
        ScriptAction::DragStart { x, y } => controller.pointer_down(at(x, y), PointerButton::Left),
        ScriptAction::Drag { x, y } => controller.pointer_move(at(x, y)),
        ScriptAction::DragEnd { x, y } => {
            controller.pointer_up(at(x, y), PointerButton::Left);
            controller.click(at(x, y), PointerButton::Left);
        }
        ScriptAction::Menu { item } => {
            if controller.context_menu().is_none() {
                anyhow::bail!("no context menu is open");
            }
            controller.choose(item);
        }
        ScriptAction::Finish => {
            controller.finish_drawing();
        }
        ScriptAction::Cancel => controller.cancel_drawing(),
        ScriptAction::ClearLines => {
            controller.clear_lines();
        }
        ScriptAction::ClearAreas => {
            controller.clear_areas();
        }
        ScriptAction::ClearAll => {
            controller.clear_all();
        }
        ScriptAction::Exit => controller.exit(),
        ScriptAction::SetUnit { kind, unit } => {
            let unit = DisplayUnit::parse(kind, &unit)?;
            controller.set_display_unit(unit);
        }
    }

    Ok(())
}
