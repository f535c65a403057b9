mod common;

use std::{fs::File, io::BufWriter, time::Duration};

use body_track::{
    metadata::{joints_sample_entry, MetadataGroup, MetadataItem, JOINTS_DATA_TYPE, JOINTS_KEY},
    BodySample, BodyTrackError, BodyTrackReader,
};
use bytes::Bytes;
use glam::{Mat4, Vec3};
use mp4_box::{
    boxes::{
        ftyp::FtypBox,
        mebx::{MetadataKey, MetadataSampleEntry},
        tref::CONTENT_DESCRIBES,
    },
    writer::MovieWriter,
};

use common::{joints_at, metadata_track, temp_movie, video_track, write_movie, FRAME_UNITS};

#[test]
fn corrupt_sample_does_not_stop_the_others() {
    let mut samples: Vec<Bytes> = (0..10).map(|i| joints_at(i as f32)).collect();
    // The item header claims more bytes than the sample holds
    let mut truncated = samples[5].to_vec();
    truncated.truncate(truncated.len() / 2);
    samples[5] = Bytes::from(truncated);

    let path = write_movie(joints_sample_entry(), 10, &samples);
    let decoded: Vec<_> = BodyTrackReader::open(&path).unwrap().samples().collect();

    assert_eq!(decoded.len(), 10);
    for timed in &decoded {
        assert_eq!(timed.time, Duration::from_nanos(timed.index as u64 * FRAME_UNITS * 1_000_000_000 / 600));
        if timed.index == 5 {
            assert!(matches!(timed.sample, Err(BodyTrackError::MalformedPayload(_))));
        } else {
            match &timed.sample {
                Ok(BodySample::Joints(joints)) => {
                    let root = joints.root().unwrap();
                    assert_eq!(root.w_axis.x, timed.index as f32);
                }
                other => panic!("sample {} decoded as {:?}", timed.index, other),
            }
        }
    }
    std::fs::remove_file(path).unwrap();
}

#[test]
fn invalid_json_is_reported_per_sample() {
    let garbage = MetadataGroup {
        items: vec![MetadataItem { key_id: 1, value: Bytes::from_static(b"{\"root\": [1, 2") }],
    }
    .encode();
    let samples = vec![joints_at(0.0), garbage, MetadataGroup::empty().encode()];
    let path = write_movie(joints_sample_entry(), 3, &samples);

    let decoded: Vec<_> = BodyTrackReader::open(&path).unwrap().samples().map(|s| s.sample).collect();
    assert!(matches!(decoded[0], Ok(BodySample::Joints(_))));
    assert!(matches!(decoded[1], Err(BodyTrackError::MalformedPayload(_))));
    assert!(matches!(decoded[2], Ok(BodySample::NoSubject)));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn legacy_anchor_key_is_read_as_root() {
    let values: Vec<String> = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))
        .transpose()
        .to_cols_array()
        .iter()
        .map(|v| v.to_string())
        .collect();
    let payload = format!("{{\"anchor\": [{}]}}", values.join(", "));
    let group = MetadataGroup {
        items: vec![MetadataItem { key_id: 1, value: Bytes::from(payload) }],
    };
    let path = write_movie(joints_sample_entry(), 1, &[group.encode()]);

    let sample = BodyTrackReader::open(&path).unwrap().samples().next().unwrap().sample.unwrap();
    match sample {
        BodySample::Joints(joints) => {
            assert_eq!(joints.root(), Some(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))));
        }
        BodySample::NoSubject => panic!("expected joints"),
    }
    std::fs::remove_file(path).unwrap();
}

#[test]
fn items_under_other_keys_are_skipped() {
    let entry = MetadataSampleEntry {
        data_reference_index: 1,
        keys: vec![
            MetadataKey::reverse_dns(1, "com.example.other", JOINTS_DATA_TYPE),
            MetadataKey::reverse_dns(7, JOINTS_KEY, JOINTS_DATA_TYPE),
        ],
    };
    let mut joints = MetadataGroup::decode(&joints_at(3.0)).unwrap();
    joints.items[0].key_id = 7;
    let group = MetadataGroup {
        items: vec![MetadataItem { key_id: 1, value: Bytes::from_static(b"[]") }, joints.items[0].clone()],
    };
    let path = write_movie(entry, 1, &[group.encode()]);

    let sample = BodyTrackReader::open(&path).unwrap().samples().next().unwrap().sample.unwrap();
    assert!(matches!(sample, BodySample::Joints(j) if j.len() == 2));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn movie_without_the_joint_key_is_rejected() {
    let unrelated = MetadataSampleEntry {
        data_reference_index: 1,
        keys: vec![MetadataKey::reverse_dns(1, "com.example.other", JOINTS_DATA_TYPE)],
    };
    let wrong_type = MetadataSampleEntry {
        data_reference_index: 1,
        keys: vec![MetadataKey::reverse_dns(1, JOINTS_KEY, "com.apple.metadata.datatype.UTF-8")],
    };

    for entry in [unrelated, wrong_type] {
        let path = write_movie(entry, 2, &[joints_at(0.0)]);
        assert!(matches!(BodyTrackReader::open(&path), Err(BodyTrackError::TrackNotFound { .. })));
        std::fs::remove_file(path).unwrap();
    }
}

#[test]
fn referenced_video_track_is_primary() {
    let path = temp_movie();
    let file = BufWriter::new(File::create(&path).unwrap());
    let mut writer = MovieWriter::new(file, &FtypBox::default(), 600).unwrap();
    let short = writer.add_track(video_track());
    let long = writer.add_track(video_track());
    let metadata = writer.add_track(metadata_track(joints_sample_entry()));
    writer.add_reference(metadata, CONTENT_DESCRIBES, long).unwrap();

    writer.write_sample(short, &[0; 4], 0, true).unwrap();
    writer.write_sample(long, &[0; 4], 0, true).unwrap();
    writer.write_sample(metadata, &joints_at(0.0), 0, true).unwrap();
    writer.write_sample(long, &[0; 4], 600, true).unwrap();
    writer.finish(1200).unwrap();

    let reader = BodyTrackReader::open(&path).unwrap();
    assert_eq!(reader.primary_track_id(), Some(long));
    assert_eq!(reader.duration(), Duration::from_secs(2));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn missing_file_fails_to_open() {
    let result = BodyTrackReader::open(temp_movie());
    assert!(matches!(result, Err(BodyTrackError::Container(_))));
}
