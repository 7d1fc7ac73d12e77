use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use failure::{bail, Error, ResultExt};
use log::{info, warn};
use structopt::StructOpt;

use cartdisk::{
    check_logo,
    disk::{cluster_lba, entry_cluster, entry_size, BLOCK_SIZE, DISK_BLOCK_COUNT},
    BlockDevice, CartSession, Config, EmulatedCartridge,
};
use crate::args::{Args, Command};


mod args;

/// Blocks read from the session per request when exporting.
const CHUNK_BLOCKS: u32 = 64;

fn main() {
    // We just catch potential errors here and pretty print them.
    if let Err(e) = run() {
        println!("ERROR: {}", e);

        for cause in e.iter_causes() {
            println!("  ... caused by: {}", cause);
        }

        std::process::exit(1);
    }
}

/// The actual main function.
fn run() -> Result<(), Error> {
    // Parse CLI arguments
    let args = Args::from_args();

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_module("cartdisk", args.log_level);
    builder.init();

    let mut session = boot(&args)?;

    match &args.command {
        Command::Info => print_info(&session),
        Command::Dump { lba, blocks } => dump(&mut session, *lba, *blocks)?,
        Command::Image { out } => write_image(&mut session, out)?,
        Command::ExportSave { out } => export_save(&mut session, out)?,
    }

    Ok(())
}

/// Loads the ROM (and save) into an emulated cartridge and boots the core.
fn boot(args: &Args) -> Result<CartSession<EmulatedCartridge>, Error> {
    let rom = fs::read(&args.path_to_rom).context("failed to load ROM file")?;
    let save = match &args.save {
        Some(path) => Some(fs::read(path).context("failed to load save file")?),
        None => None,
    };

    let mut cart = EmulatedCartridge::new(rom, save).context("invalid ROM file")?;

    // The adapter would wait forever for a cartridge with a good logo. Here,
    // a bad logo is most likely a homebrew ROM, so we just carry on.
    if let Err(addr) = check_logo(&mut cart) {
        warn!("logo mismatch at {}, real hardware would not boot this cartridge", addr);
    }

    let config = Config { self_test: args.self_test };
    let session = CartSession::boot(cart, &config);
    info!("booted: {:#?}", session.descriptor());

    Ok(session)
}

fn print_info(session: &CartSession<EmulatedCartridge>) {
    let layout = session.layout();

    println!("{}", session.descriptor());
    println!("Disk: {} blocks of {} bytes", DISK_BLOCK_COUNT, BLOCK_SIZE);
    println!("Data ends at LBA 0x{:x}", layout.data_end);
    println!();

    println!("{:<12} {:>8} {:>10} {:>10}", "name", "cluster", "LBA", "size");
    let dir = layout.root_dir();
    for i in 1..dir.len() {
        if let Some(entry) = dir.entry(i) {
            let cluster = entry_cluster(entry);
            println!(
                "{:<12} {:>8} {:>#10x} {:>10}",
                short_name(&entry[..11]),
                cluster,
                cluster_lba(cluster),
                entry_size(entry),
            );
        }
    }
    println!();

    println!("--- STATUS.TXT ---");
    print!("{}", String::from_utf8_lossy(session.status().as_bytes()));
}

/// Turns a raw 8.3 name into `NAME.EXT`.
fn short_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(&raw[..8]);
    let ext = String::from_utf8_lossy(&raw[8..11]);
    format!("{}.{}", name.trim_end(), ext.trim_end())
}

fn dump(session: &mut CartSession<EmulatedCartridge>, lba: u32, blocks: u32) -> Result<(), Error> {
    let mut buf = vec![0; blocks as usize * BLOCK_SIZE];
    session.read10(0, lba, 0, &mut buf).context("failed to read disk")?;

    for (i, line) in buf.chunks(16).enumerate() {
        let pos = lba as usize * BLOCK_SIZE + i * 16;
        let hex: Vec<_> = line.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = line.iter()
            .map(|&b| if b >= 0x20 && b < 0x7F { b as char } else { '.' })
            .collect();

        println!("{:08x}  {:<47}  |{}|", pos, hex.join(" "), ascii);
    }

    Ok(())
}

/// Writes every block up to the end of the last file and extends the file to
/// the full disk size (sparse on most file systems).
fn write_image(session: &mut CartSession<EmulatedCartridge>, out: &Path) -> Result<(), Error> {
    let data_end = session.layout().data_end;
    let mut file = File::create(out).context("failed to create image file")?;

    let mut buf = vec![0; CHUNK_BLOCKS as usize * BLOCK_SIZE];
    let mut lba = 0;
    while lba < data_end {
        let n = CHUNK_BLOCKS.min(data_end - lba);
        let chunk = &mut buf[..n as usize * BLOCK_SIZE];
        session.read10(0, lba, 0, chunk).context("failed to read disk")?;
        file.write_all(chunk).context("failed to write image file")?;
        lba += n;
    }

    file.set_len(DISK_BLOCK_COUNT as u64 * BLOCK_SIZE as u64)
        .context("failed to resize image file")?;
    println!("wrote {} blocks to '{}'", DISK_BLOCK_COUNT, out.display());

    Ok(())
}

fn export_save(session: &mut CartSession<EmulatedCartridge>, out: &Path) -> Result<(), Error> {
    let ram = session.layout().ram;
    let size = session.mapper().ram_size() as usize;
    if size == 0 {
        bail!("the cartridge has no RAM");
    }

    let mut buf = vec![0; size];
    session.read10(0, ram.start_lba(), 0, &mut buf).context("failed to read save file")?;
    fs::write(out, &buf).context("failed to write save file")?;
    println!("wrote {} bytes of RAM to '{}'", size, out.display());

    Ok(())
}
