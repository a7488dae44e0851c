//! The hexmap command line tool.

#![deny(unsafe_code)]

use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use hexmap::anchor::AnchorTable;
use hexmap::delta::Delta;
use hexmap::error::Action;
use hexmap::error::Cause;
use hexmap::error::Errors;
use hexmap::error::Located;
use hexmap::gfx::RenderCache;
use hexmap::map;
use hexmap::map::Direction;
use hexmap::map::Grid;
use hexmap::map::Layout;
use hexmap::meta;
use hexmap::run;
use hexmap::run::RunKind;
use hexmap::space::Model;

/// Inspect and edit Game Boy Advance map data.
#[derive(StructOpt)]
struct Opts {
  /// A metadata file naming anchors in the image.
  #[structopt(long, global = true, parse(from_os_str))]
  meta: Option<PathBuf>,
  #[structopt(subcommand)]
  command: Command,
}

#[derive(StructOpt)]
enum Command {
  /// Lists every known run.
  Runs {
    /// The image to read.
    #[structopt(parse(from_os_str))]
    rom: PathBuf,
  },
  /// Prints the blockmap of a layout.
  Map {
    /// The image to read.
    #[structopt(parse(from_os_str))]
    rom: PathBuf,
    /// The address of the layout header.
    #[structopt(parse(try_from_str = parse_address))]
    layout: u32,
  },
  /// Moves one edge of a layout's map.
  Resize {
    /// The image to read.
    #[structopt(parse(from_os_str))]
    rom: PathBuf,
    /// The address of the layout header.
    #[structopt(parse(try_from_str = parse_address))]
    layout: u32,
    /// The edge to move: left, right, up, or down.
    direction: Direction,
    /// How far to move it; negative values shrink the map.
    #[structopt(allow_hyphen_values = true)]
    amount: i64,
    /// Where to write the edited image.
    #[structopt(short, long, parse(from_os_str))]
    out: PathBuf,
  },
  /// Writes a pointer.
  Pointer {
    /// The image to read.
    #[structopt(parse(from_os_str))]
    rom: PathBuf,
    /// The address to write the pointer at.
    #[structopt(parse(try_from_str = parse_address))]
    address: u32,
    /// The destination: `<name>`, `<hex>`, or `<null>`.
    text: String,
    /// Where to write the edited image.
    #[structopt(short, long, parse(from_os_str))]
    out: PathBuf,
  },
}

fn parse_address(text: &str) -> Result<u32, String> {
  meta::parse_address(text).ok_or_else(|| format!("bad address `{}`", text))
}

type Failure<'a> = Errors<Located<'a, Box<dyn StdError>>>;

fn fail<'a>(
  error: impl Into<Box<dyn StdError>>,
  cause: Cause<'a>,
  action: Action,
) -> Failure<'a> {
  let mut errors = Errors::new();
  errors.push(Located::new(error.into(), cause, action));
  errors
}

/// The loaded image, with whatever the metadata file says about it.
struct Session {
  model: Model,
  anchors: AnchorTable,
}

impl Session {
  fn load<'a>(
    rom: &'a Path,
    meta: Option<&'a Path>,
  ) -> Result<Self, Failure<'a>> {
    let bytes = fs::read(rom)
      .map_err(|e| fail(e, Cause::File(rom), Action::Loading))?;
    let mut model = Model::new(bytes);
    let mut anchors = AnchorTable::new();
    tracing::info!(
      len = model.len(),
      code = model.game_code().as_str(),
      "loaded {}",
      model.version()
    );

    if let Some(path) = meta {
      let metadata = meta::load(path)
        .map_err(|e| fail(e.error, Cause::File(path), Action::Loading))?;
      metadata
        .apply(&mut model, &mut anchors)
        .map_err(|e| fail(e, Cause::File(path), Action::Observing))?;
    }
    Ok(Self { model, anchors })
  }

  fn save<'a>(&self, out: &'a Path, delta: &Delta) -> Result<(), Failure<'a>> {
    fs::write(out, self.model.bytes())
      .map_err(|e| fail(e, Cause::File(out), Action::Saving))?;
    tracing::info!(changed = delta.len(), "wrote {}", out.display());
    Ok(())
  }
}

fn list_runs(session: &Session) {
  for run in session.model.runs() {
    let name = session
      .anchors
      .iter()
      .find(|&(_, addr)| addr == run.start())
      .map(|(name, _)| name);
    print!("{:06X} {:>3} {:>6}", run.start(), run.format_name(), run.len());
    if let Some(name) = name {
      print!(" ^{}", name);
    }
    match run.kind() {
      RunKind::Pointer { destination } => print!(" -> {}", destination),
      RunKind::Blockmap { width, height } => print!(" {}x{}", width, height),
      _ => {}
    }
    if !run.sources().is_empty() {
      let sources = run
        .sources()
        .iter()
        .map(|source| format!("{:06X}", source))
        .collect::<Vec<_>>();
      print!(" <- {}", sources.join(", "));
    }
    println!();
  }
}

fn print_map<'a>(
  session: &mut Session,
  layout: u32,
) -> Result<(), Failure<'a>> {
  let layout = Layout::new(layout);
  let cause = Cause::Address(layout.start());
  let run = layout
    .observe(&mut session.model)
    .map_err(|e| fail(e, cause, Action::Observing))?;
  let (width, height) = match run.kind() {
    RunKind::Blockmap { width, height }
      if map::is_within_size_limit(width as i64, height as i64) =>
    {
      (width as usize, height as usize)
    }
    _ => (0, 0),
  };
  let grid = Grid::read(&session.model, run.start(), width, height);
  println!(
    "layout {:06X}: {}x{} blocks at {:06X}",
    layout.start(),
    width,
    height,
    run.start()
  );
  for y in 0..grid.height() {
    let row = (0..grid.width())
      .map(|x| format!("{:03X}", grid.get(x, y).unwrap_or(0) & 0x3ff))
      .collect::<Vec<_>>();
    println!("  {}", row.join(" "));
  }

  let mut cache = RenderCache::new();
  let canvas = map::render_map(&session.model, layout, &mut cache)
    .map_err(|e| fail(e, cause, Action::Rendering))?;
  println!("rendered {}x{} pixels", canvas.width(), canvas.height());
  Ok(())
}

fn execute(opts: &Opts) -> Result<(), Failure<'_>> {
  let meta = opts.meta.as_deref();
  match &opts.command {
    Command::Runs { rom } => {
      let session = Session::load(rom, meta)?;
      list_runs(&session);
    }
    Command::Map { rom, layout } => {
      let mut session = Session::load(rom, meta)?;
      print_map(&mut session, *layout)?;
    }
    Command::Resize {
      rom,
      layout,
      direction,
      amount,
      out,
    } => {
      let mut session = Session::load(rom, meta)?;
      let cause = Cause::Address(*layout);
      let run = Layout::new(*layout)
        .observe(&mut session.model)
        .map_err(|e| fail(e, cause, Action::Observing))?;
      let mut delta = Delta::new();
      let old = run.start();
      let run = map::try_resize(
        &mut session.model,
        &mut delta,
        &run,
        *direction,
        *amount,
      )
      .map_err(|e| fail(e, cause, Action::Resizing))?;
      if let Some(name) = session.anchors.moved(old, run.start()) {
        tracing::warn!(
          name,
          from = old,
          to = run.start(),
          "named map moved; its metadata entry is now stale"
        );
      }
      println!("{} at {:06X}", run.format_name(), run.start());
      session.save(out, &delta)?;
    }
    Command::Pointer {
      rom,
      address,
      text,
      out,
    } => {
      let mut session = Session::load(rom, meta)?;
      let mut delta = Delta::new();
      let run = run::edit_pointer(
        &mut session.model,
        &mut delta,
        &session.anchors,
        *address,
        text,
      )
      .map_err(|e| fail(e, Cause::Address(*address), Action::Editing))?;
      let cell = session.model.decode_cell(run.start(), &session.anchors);
      println!("{:06X}: {}", run.start(), cell);
      session.save(out, &delta)?;
    }
  }
  Ok(())
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let opts = Opts::from_args();
  if let Err(errors) = execute(&opts) {
    errors.dump_and_die(1);
  }
}
