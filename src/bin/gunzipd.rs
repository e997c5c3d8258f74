use filebuffer::FileBuffer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use structopt::StructOpt;
use turbo_inflate_rs::{gunzip, gzip_info};

#[derive(StructOpt)]
struct GunzipParams {
    input: PathBuf,
    output: Option<PathBuf>,
    #[structopt(short)]
    simulate: bool,
}

fn main() {
    let params: GunzipParams = GunzipParams::from_args();

    let data = FileBuffer::open(&params.input).unwrap();
    let info = gzip_info(&data).unwrap();

    let mut out = vec![0u8; info.uncompressed_size as usize];
    let written = gunzip(&data, &mut out).unwrap();

    println!(
        "{} => {} bytes{}",
        params.input.display(),
        written,
        info.name
            .map(|name| format!(" (original name: {})", name))
            .unwrap_or_default()
    );

    if !params.simulate {
        let mut write_file = BufWriter::new(
            File::create(
                params
                    .output
                    .unwrap_or_else(|| params.input.with_extension("")),
            )
            .unwrap(),
        );
        write_file.write_all(&out[..written]).unwrap();
    }
}
