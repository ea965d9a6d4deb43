mod common;

use common::*;
use tin_archive::prelude::*;
use tin_archive::timestamp_key;
use tin_archive::xdmf::Document;

struct Fixture {
    _dir: tempfile::TempDir,
    tins: MeshArchive,
    shades: ShadeArchive,
}

fn fixture() -> Fixture {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let tins = MeshArchive::new(dir.path().join("tins")).unwrap();
    std::fs::create_dir(dir.path().join("shades")).unwrap();
    let shades = ShadeArchive::new(dir.path().join("shades")).unwrap();

    tins.save("strip", &strip(), Some(&globcover()), Some(&strip_fields()))
        .unwrap();

    Fixture {
        _dir: dir,
        tins,
        shades,
    }
}

#[test]
fn shade_archive_needs_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = ShadeArchive::new(dir.path().join("missing"));
    assert!(matches!(out, Err(Error::NotADirectory(_))));
}

#[test]
fn samples_round_trip() {
    let f = fixture();

    let timestamps = [1577836800.0, 1577840400.25, 1577844000.5];
    let samples = [vec![0, 1, 1, 0], vec![1, 1, 1, 1], vec![0, 0, 0, 1]];

    let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
    assert_eq!(writer.num_faces(), 4);
    for (timestamp, sample) in timestamps.iter().zip(samples.iter()) {
        writer.save(*timestamp, sample).unwrap();
    }

    // nothing is visible before the session ends
    assert_eq!(f.shades.info("s1").unwrap(), None);
    writer.close().unwrap();

    let info = f.shades.info("s1").unwrap().unwrap();
    assert_eq!(info.tin_uid, "strip");
    let expected: Vec<String> = timestamps.iter().map(|t| timestamp_key(*t)).collect();
    assert_eq!(info.timestamps, expected);

    for (timestamp, sample) in timestamps.iter().zip(samples.iter()) {
        let back: Vec<i32> = f.shades.read("s1", *timestamp).unwrap();
        assert_eq!(&back, sample);
    }

    let out = f.shades.read::<i32>("s1", 0.0);
    assert!(matches!(out, Err(Error::MissingSample { .. })));
}

#[test]
fn timestamps_sort_as_strings() {
    let f = fixture();

    let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
    writer.save(10.0, &[0.5, 0.5, 0.5, 0.5]).unwrap();
    writer.save(9.0, &[0.1, 0.2, 0.3, 0.4]).unwrap();
    writer.close().unwrap();

    let info = f.shades.info("s1").unwrap().unwrap();
    assert_eq!(info.timestamps, vec!["10.0000", "9.0000"]);

    let back: Vec<f64> = f.shades.read("s1", 9.0).unwrap();
    assert_eq!(back, vec![0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn sample_length_must_match_faces() {
    let f = fixture();

    let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
    let out = writer.save(1.0, &[1, 2, 3]);
    assert!(matches!(
        out,
        Err(Error::ShapeMismatch {
            expected: 4,
            actual: 3
        })
    ));

    // the session is still usable
    writer.save(1.0, &[1, 2, 3, 4]).unwrap();
    writer.close().unwrap();
    assert_eq!(f.shades.info("s1").unwrap().unwrap().timestamps.len(), 1);
}

#[test]
fn duplicate_timestamps_are_rejected() {
    let f = fixture();

    let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
    writer.save(1.00001, &[1, 2, 3, 4]).unwrap();
    // the same key once rounded to four decimals
    let out = writer.save(1.00002, &[5, 6, 7, 8]);
    assert!(matches!(out, Err(Error::DuplicateTimestamp { .. })));
    writer.close().unwrap();

    let back: Vec<i32> = f.shades.read("s1", 1.0).unwrap();
    assert_eq!(back, vec![1, 2, 3, 4]);
}

#[test]
fn open_checks_before_touching_files() {
    let f = fixture();

    let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
    writer.save(1.0, &[1, 1, 1, 1]).unwrap();
    writer.close().unwrap();

    let out = f.shades.open("s1", &f.tins, "strip", false);
    assert!(matches!(out, Err(Error::AlreadyExists { .. })));
    assert_eq!(f.shades.info("s1").unwrap().unwrap().timestamps.len(), 1);

    let out = f.shades.open("s2", &f.tins, "no-such-tin", false);
    assert!(matches!(out, Err(Error::NotFound { .. })));
    assert!(!f.shades.data_file("s2").exists());

    // a missing parent leaves existing files alone even with overwrite
    let out = f.shades.open("s1", &f.tins, "no-such-tin", true);
    assert!(matches!(out, Err(Error::NotFound { .. })));
    assert!(f.shades.data_file("s1").exists());
}

#[test]
fn overwrite_discards_previous_samples() {
    let f = fixture();

    let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
    writer.save(1.0, &[1, 1, 1, 1]).unwrap();
    writer.save(2.0, &[2, 2, 2, 2]).unwrap();
    writer.close().unwrap();

    let mut writer = f.shades.open("s1", &f.tins, "strip", true).unwrap();
    writer.save(3.0, &[3, 3, 3, 3]).unwrap();
    writer.close().unwrap();

    let info = f.shades.info("s1").unwrap().unwrap();
    assert_eq!(info.timestamps, vec!["3.0000"]);
}

#[test]
fn dropping_the_writer_finalizes() {
    let f = fixture();

    {
        let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
        writer.save(5.0, &[0, 0, 1, 1]).unwrap();
    }

    let info = f.shades.info("s1").unwrap().unwrap();
    assert_eq!(info.timestamps, vec!["5.0000"]);
}

#[test]
fn info_of_unknown_entry() {
    let f = fixture();
    assert_eq!(f.shades.info("nothing").unwrap(), None);
    assert!(matches!(
        f.shades.read::<i32>("nothing", 1.0),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn document_is_a_temporal_collection() {
    let f = fixture();

    let mut writer = f.shades.open("s1", &f.tins, "strip", false).unwrap();
    writer.save(1.0, &[1, 2, 3, 4]).unwrap();
    writer.save(2.5, &[0.5, 0.5, 0.5, 0.5]).unwrap();
    writer.close().unwrap();

    let document = Document::from_path(&f.shades.metadata_file("s1")).unwrap();
    let domain = document.root.find("Domain").unwrap();
    assert_eq!(domain.find_all("Grid").count(), 1);

    let collection = domain.find("Grid").unwrap();
    assert_eq!(collection.attribute("Name"), Some("shadow_times"));
    assert_eq!(collection.attribute("GridType"), Some("Collection"));
    assert_eq!(collection.attribute("CollectionType"), Some("Temporal"));

    let grids: Vec<_> = collection.find_all("Grid").collect();
    assert_eq!(grids.len(), 2);

    let tin_dir = std::fs::canonicalize(f.tins.path()).unwrap();
    let shade_file = std::fs::canonicalize(f.shades.data_file("s1")).unwrap();

    for (grid, (key, data_type)) in grids.iter().zip([("1.0000", "Int"), ("2.5000", "Float")]) {
        // the parent's face fields are not part of the samples
        let attributes: Vec<_> = grid.find_all("Attribute").collect();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].attribute("Name"), Some("shade"));
        assert_eq!(attributes[0].attribute("Center"), Some("Cell"));

        let item = attributes[0].find("DataItem").unwrap();
        assert_eq!(item.attribute("Dimensions"), Some("4"));
        assert_eq!(item.attribute("DataType"), Some(data_type));
        assert_eq!(item.trimmed_text(), shade_file.display().to_string());
        assert_eq!(item.attribute("Name"), Some(format!("/strip/{key}").as_str()));
        assert_eq!(item.attribute("Format"), Some("Binary"));

        assert_eq!(grid.find("Time").unwrap().attribute("Value"), Some(key));

        let points = grid.find_path("Geometry/DataItem").unwrap();
        assert_eq!(
            points.trimmed_text(),
            tin_dir.join("strip.tbc").display().to_string()
        );
        assert_eq!(points.attribute("Name"), Some("/tin/points"));
        let faces = grid.find_path("Topology/DataItem").unwrap();
        assert_eq!(
            faces.trimmed_text(),
            tin_dir.join("strip.tbc").display().to_string()
        );
        assert_eq!(faces.attribute("Name"), Some("/tin/faces"));
    }

    // the first sample sits at its advertised offset in the shade container
    let item = grids[0].find_path("Attribute/DataItem").unwrap();
    let seek: usize = item.attribute("Seek").unwrap().parse().unwrap();
    let bytes = std::fs::read(&shade_file).unwrap();
    let values: Vec<i32> = bytes[seek..seek + 16]
        .chunks(4)
        .map(|b| i32::from_le_bytes(b.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![1, 2, 3, 4]);
}
