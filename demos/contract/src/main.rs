use argh::FromArgs;

use contra::ops::{contract_with_path, ContractionPath};
use contra::tensor::{CpuAllocator, Tensor};

/// Where the operands come from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Source {
    /// The 2x2x2x2 tensor `1..=16` and the 2x2 tensor `[[1, 2], [3, 4]]`.
    Literal,
    /// `I[p, q, r, s] = p + q + r + s` and `D[r, s] = r + s` of the requested shape.
    Generated,
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(Self::Literal),
            "generated" => Ok(Self::Generated),
            _ => Err(format!("unknown source `{s}`, expected literal or generated")),
        }
    }
}

fn parse_shape(value: &str) -> Result<[usize; 4], String> {
    let dims = value
        .split(',')
        .map(|d| d.trim().parse::<usize>().map_err(|e| format!("`{d}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    dims.try_into()
        .map_err(|dims: Vec<usize>| format!("expected 4 dimensions, got {}", dims.len()))
}

#[derive(FromArgs)]
/// Contract a rank-4 tensor with a rank-2 tensor over the trailing two dimensions
struct Args {
    /// operand source: literal or generated
    #[argh(option, default = "Source::Literal")]
    source: Source,

    /// shape P,Q,R,S of the generated rank-4 operand
    #[argh(option, from_str_fn(parse_shape), default = "[10, 10, 10, 10]")]
    shape: [usize; 4],

    /// evaluation path: naive, optimized or parallel
    #[argh(option, short = 'p', default = "ContractionPath::Optimized")]
    path: ContractionPath,

    /// also run the naive path and check that the results agree
    #[argh(switch, short = 'c')]
    compare: bool,

    /// report the elapsed time in milliseconds
    #[argh(switch, short = 't')]
    time: bool,

    /// number of threads of the parallel path
    #[argh(option)]
    threads: Option<usize>,
}

fn operands(
    source: Source,
    shape: [usize; 4],
) -> Result<(Tensor<i64, 4>, Tensor<i64, 2>), Box<dyn std::error::Error>> {
    let (i, d) = match source {
        Source::Literal => (
            Tensor::<i32, 4>::from_shape_vec([2, 2, 2, 2], (1..=16).collect(), CpuAllocator)?,
            Tensor::<i32, 2>::from_shape_vec([2, 2], vec![1, 2, 3, 4], CpuAllocator)?,
        ),
        Source::Generated => {
            let [_, _, r, s] = shape;
            (
                Tensor::<i32, 4>::from_shape_fn(shape, CpuAllocator, |[p, q, r, s]| {
                    (p + q + r + s) as i32
                })?,
                Tensor::<i32, 2>::from_shape_fn([r, s], CpuAllocator, |[r, s]| (r + s) as i32)?,
            )
        }
    };

    // sums of products of i32 values overflow quickly, accumulate in i64
    Ok((i.cast::<i64>()?, d.cast::<i64>()?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
        log::info!("using {} threads", threads);
    }

    let (i, d) = operands(args.source, args.shape)?;
    log::info!("I: {:?}, D: {:?}", i.shape, d.shape);

    let now = std::time::Instant::now();
    let j = contract_with_path(&i, &d, args.path)?;
    let elapsed = now.elapsed();

    println!("{j}");

    if args.time {
        println!(
            "{} path: {:.3} ms",
            args.path,
            elapsed.as_secs_f64() * 1e3
        );
    }

    if args.compare {
        let now = std::time::Instant::now();
        let reference = contract_with_path(&i, &d, ContractionPath::Naive)?;
        let naive_elapsed = now.elapsed();

        println!(
            "naive path: {:.3} ms, {} path: {:.3} ms",
            naive_elapsed.as_secs_f64() * 1e3,
            args.path,
            elapsed.as_secs_f64() * 1e3
        );
        if reference.as_slice() == j.as_slice() {
            println!("results agree");
        } else {
            log::error!("the {} path disagrees with the naive path", args.path);
            println!("results differ");
        }
    }

    Ok(())
}
