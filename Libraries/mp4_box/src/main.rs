use std::env;
use std::process;

use mp4_box::boxes::stsd::SampleEntry;
use mp4_box::format_fourcc;
use mp4_box::reader::MovieFile;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <movie_file> [--tree]", args[0]);
        process::exit(1);
    }

    let mut movie = match MovieFile::open(&args[1]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to open movie '{}': {}", args[1], e);
            process::exit(1);
        }
    };

    println!("'{}' ({} bytes):", args[1], movie.length());
    for top in movie.top_level_boxes() {
        println!("  {} at {} ({} bytes)", format_fourcc(&top.box_type), top.offset, top.size);
    }

    if args.iter().any(|a| a == "--tree") {
        println!("\n{:#?}\n", movie.moov());
    }

    let track_ids: Vec<u32> = movie.moov().traks.iter().map(|t| t.track_id()).collect();
    for track_id in track_ids {
        let index = match movie.track_index(track_id) {
            Ok(i) => i,
            Err(e) => {
                eprintln!("Track {}: {}", track_id, e);
                continue;
            }
        };
        println!(
            "\nTrack {} [{}] timescale {} samples {} starts at {}",
            track_id,
            format_fourcc(&index.handler_type),
            index.timescale,
            index.samples.len(),
            index.presentation_offset
        );

        let Some(trak) = movie.moov().track(track_id) else { continue };
        for entry in &trak.mdia.minf.stbl.stsd.entries {
            if let SampleEntry::Metadata(mebx) = entry {
                for key in &mebx.keys {
                    println!(
                        "  key {} = {} ({})",
                        key.local_key_id,
                        key.identifier(),
                        key.data_type_name().unwrap_or_default()
                    );
                }
            }
        }
        if let Some(tref) = &trak.tref {
            for reference in &tref.references {
                println!("  {} -> {:?}", format_fourcc(&reference.reference_type), reference.track_ids);
            }
        }

        let first = index.samples.first().copied();
        if let Some(sample) = first {
            match movie.read_sample(&sample) {
                Ok(bytes) => println!("  first sample ({} bytes) at {}", bytes.len(), index.presentation_time(&sample)),
                Err(e) => eprintln!("  first sample unreadable: {}", e),
            }
        }
    }
}
