use std::f64::consts::PI;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use kineto::{
    Animation, Canvas, Fps, FrameIndex, FrameRgba, Interval, KinetoResult, Renderer, SaveOpts,
    WriterId,
};

#[derive(Parser, Debug)]
#[command(name = "kineto", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a built-in demo animation and save it through a writer.
    Demo(DemoArgs),
    /// List registered writers and their supported output formats.
    Writers,
}

#[derive(Parser, Debug)]
struct DemoArgs {
    /// Which demo to render.
    #[arg(long, value_enum, default_value_t = DemoKind::Lissajous)]
    kind: DemoKind,

    /// Output media path; the extension selects the format.
    #[arg(long)]
    out: PathBuf,

    /// Writer name (see `kineto writers`).
    #[arg(long, default_value = "image")]
    writer: String,

    /// Saved frame rate in frames per second.
    #[arg(long, default_value_t = 20)]
    fps: u32,

    /// Number of frames (defaults to 400 for lissajous, 20 for bars).
    #[arg(long)]
    frames: Option<u64>,

    /// Square canvas size in pixels.
    #[arg(long, default_value_t = 240)]
    size: u32,

    /// Extra argument forwarded to an external encoder (repeatable).
    #[arg(long = "extra-arg")]
    extra_args: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DemoKind {
    /// Function mode: a growing Lissajous scatter trail.
    Lissajous,
    /// Artist-list mode: a four-bar race from precomputed snapshots.
    Bars,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo(args) => cmd_demo(args),
        Command::Writers => cmd_writers(),
    }
}

fn cmd_writers() -> anyhow::Result<()> {
    for &id in WriterId::all() {
        eprintln!("{:18} {}", id.name(), id.supported_formats().join(" "));
    }
    Ok(())
}

fn cmd_demo(args: DemoArgs) -> anyhow::Result<()> {
    let canvas = Canvas::new(args.size, args.size)?;
    let fps = Fps::new(args.fps, 1)?;
    let opts = SaveOpts::new(fps).with_extra_args(args.extra_args.clone());

    let written = match args.kind {
        DemoKind::Lissajous => {
            let frames = args.frames.unwrap_or(400);
            let mut ani = lissajous_animation(canvas, frames)?;
            ani.save(&args.out, &args.writer, opts)?
        }
        DemoKind::Bars => {
            let frames = args.frames.unwrap_or(20);
            let mut ani = bars_animation(canvas, frames)?;
            ani.save(&args.out, &args.writer, opts)?
        }
    };

    eprintln!("wrote {} ({} frames)", args.out.display(), written);
    Ok(())
}

/// Lissajous scatter in function mode: each update extends the trail by one
/// sample, returning the full point set drawn so far.
fn lissajous_animation(canvas: Canvas, frames: u64) -> KinetoResult<Animation<Vec<(f64, f64)>>> {
    let (a, b) = (3.0, 2.0);
    let delta = PI / 2.0;
    let n = frames.max(2);

    Ok(Animation::func(
        ScatterFigure { canvas },
        frames,
        Interval::from_millis(30)?,
        move |frame: FrameIndex| {
            let points = (0..frame.0)
                .map(|k| {
                    let t = -PI + 2.0 * PI * (k as f64) / ((n - 1) as f64);
                    ((a * t + delta).sin(), (b * t).sin())
                })
                .collect();
            Ok(points)
        },
    ))
}

/// Bar race in artist-list mode: every frame snapshot is precomputed before
/// playback starts.
fn bars_animation(canvas: Canvas, frames: u64) -> KinetoResult<Animation<Vec<f64>>> {
    let mut data = [20.0f64; 4];
    let mut snapshots = Vec::with_capacity(frames as usize);
    let mut seed = 19_680_801u64;
    for _ in 0..frames {
        for slot in data.iter_mut() {
            seed = mix64(seed);
            *slot += (seed % 10) as f64;
        }
        snapshots.push(data.to_vec());
    }

    Ok(Animation::artists(
        BarFigure { canvas },
        snapshots,
        Interval::from_millis(400)?,
    ))
}

fn mix64(mut z: u64) -> u64 {
    // SplitMix64 mixing function.
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

const BG: [u8; 4] = [250, 250, 250, 255];
const BAR_COLORS: [[u8; 4]; 4] = [
    [31, 119, 180, 255],
    [214, 39, 40, 255],
    [44, 160, 44, 255],
    [148, 103, 189, 255],
];

struct ScatterFigure {
    canvas: Canvas,
}

impl Renderer<Vec<(f64, f64)>> for ScatterFigure {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn render(&mut self, _frame: FrameIndex, points: &Vec<(f64, f64)>) -> KinetoResult<FrameRgba> {
        let mut frame = FrameRgba::solid(self.canvas, BG);
        let (w, h) = (self.canvas.width as f64, self.canvas.height as f64);
        for &(x, y) in points {
            // Data space [-1.5, 1.5] on both axes, y up.
            let px = (x + 1.5) / 3.0 * w;
            let py = (1.5 - y) / 3.0 * h;
            fill_disc(&mut frame, px, py, 2.0, [31, 119, 180, 255]);
        }
        Ok(frame)
    }
}

struct BarFigure {
    canvas: Canvas,
}

impl Renderer<Vec<f64>> for BarFigure {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn render(&mut self, _frame: FrameIndex, values: &Vec<f64>) -> KinetoResult<FrameRgba> {
        let mut frame = FrameRgba::solid(self.canvas, BG);
        let w = self.canvas.width as f64;
        let h = self.canvas.height as f64;
        let rows = values.len().max(1) as f64;
        // Bars are scaled against a fixed range, not the current maximum.
        let full_scale = 220.0;
        for (i, &v) in values.iter().enumerate() {
            let y0 = h * (i as f64 + 0.15) / rows;
            let y1 = h * (i as f64 + 0.85) / rows;
            let x1 = (v / full_scale).min(1.0) * w;
            fill_rect(&mut frame, 0.0, y0, x1, y1, BAR_COLORS[i % BAR_COLORS.len()]);
        }
        Ok(frame)
    }
}

fn put_px(frame: &mut FrameRgba, x: i64, y: i64, rgba: [u8; 4]) {
    if x < 0 || y < 0 || x >= frame.width as i64 || y >= frame.height as i64 {
        return;
    }
    let off = ((y as usize) * (frame.width as usize) + (x as usize)) * 4;
    frame.data[off..off + 4].copy_from_slice(&rgba);
}

fn fill_rect(frame: &mut FrameRgba, x0: f64, y0: f64, x1: f64, y1: f64, rgba: [u8; 4]) {
    for y in y0.floor() as i64..y1.ceil() as i64 {
        for x in x0.floor() as i64..x1.ceil() as i64 {
            put_px(frame, x, y, rgba);
        }
    }
}

fn fill_disc(frame: &mut FrameRgba, cx: f64, cy: f64, r: f64, rgba: [u8; 4]) {
    let r2 = r * r;
    for y in (cy - r).floor() as i64..=(cy + r).ceil() as i64 {
        for x in (cx - r).floor() as i64..=(cx + r).ceil() as i64 {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            if dx * dx + dy * dy <= r2 {
                put_px(frame, x, y, rgba);
            }
        }
    }
}
