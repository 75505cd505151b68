//! File-level round trips and transfer syntax conversion.

use byteordered::Endianness;
use dcmio_encoding::transfer_syntax::entries;
use dcmio_object::{
    DataObject, FileMetaTableBuilder, InMemDataSet, InMemElement, Parent, Tag, VR,
};

fn sample_object() -> DataObject {
    let mut obj =
        DataObject::new_empty_with_transfer_syntax(entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
    obj.add(InMemElement::new(
        Tag(0x0072, 0x0026),
        VR::AT,
        vec![Tag(0x0028, 0x2110), Tag(0x10B0, 0xC0A0)],
    ));
    obj.add(InMemElement::new(Tag(0x0010, 0x0010), VR::PN, "Doe^John"));
    obj.add(InMemElement::new(Tag(0x0028, 0x0010), VR::US, 512u16));

    let mut item = InMemDataSet::new();
    item.put(InMemElement::new(Tag(0x0028, 0x0011), VR::US, 1024u16));
    obj.add(InMemElement::new_sequence(Tag(0x0040, 0x0260), vec![item]));
    obj
}

fn assert_sample_values(obj: &DataObject) {
    assert_eq!(
        obj.value(Tag(0x0072, 0x0026)).unwrap().tags(),
        Ok(&[Tag(0x0028, 0x2110), Tag(0x10B0, 0xC0A0)][..])
    );
    assert_eq!(
        obj.value(Tag(0x0010, 0x0010)).unwrap().string(),
        Ok("Doe^John")
    );
    assert_eq!(obj.value(Tag(0x0028, 0x0010)).unwrap().uint16(), Ok(512));

    let seq = obj.element(Tag(0x0040, 0x0260)).unwrap();
    let item = &seq.items().unwrap()[0];
    assert_eq!(
        item.get(Tag(0x0028, 0x0011)).unwrap().value().unwrap().uint16(),
        Ok(1024)
    );
}

#[test]
fn file_round_trip_explicit_le() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.dcm");

    sample_object().write_to_file(&path).unwrap();
    let reread = DataObject::open_file(&path).unwrap();

    assert_eq!(reread.transfer_syntax().uid(), "1.2.840.10008.1.2.1");
    assert_sample_values(&reread);

    // insertion order survives the round trip
    let tags: Vec<_> = reread.iter().map(InMemElement::tag).collect();
    assert_eq!(
        tags,
        vec![
            Tag(0x0072, 0x0026),
            Tag(0x0010, 0x0010),
            Tag(0x0028, 0x0010),
            Tag(0x0040, 0x0260),
        ]
    );
}

#[test]
fn file_round_trip_after_conversion_to_big_endian() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample_be.dcm");

    let mut obj = sample_object();
    obj.set_transfer_syntax(entries::EXPLICIT_VR_BIG_ENDIAN).unwrap();
    // the conversion is value-preserving before any I/O
    assert_sample_values(&obj);

    obj.write_to_file(&path).unwrap();
    let reread = DataObject::open_file(&path).unwrap();
    assert_eq!(reread.transfer_syntax().uid(), "1.2.840.10008.1.2.2");
    assert_eq!(reread.transfer_syntax().endianness(), Endianness::Big);
    assert_sample_values(&reread);
}

#[test]
fn conversion_changes_bytes_not_values() {
    let mut obj = sample_object();
    let le_bytes = obj
        .element(Tag(0x0028, 0x0010))
        .unwrap()
        .raw_data()
        .unwrap()
        .to_vec();

    obj.set_transfer_syntax(entries::EXPLICIT_VR_BIG_ENDIAN).unwrap();
    let be_bytes = obj.element(Tag(0x0028, 0x0010)).unwrap().raw_data().unwrap();
    assert_eq!(le_bytes, &[0x00, 0x02]);
    assert_eq!(be_bytes, &[0x02, 0x00]);

    // multi-valued AT payloads swap within each pair, never wholesale
    let at_bytes = obj.element(Tag(0x0072, 0x0026)).unwrap().raw_data().unwrap();
    assert_eq!(
        at_bytes,
        &[0x00, 0x28, 0x21, 0x10, 0x10, 0xB0, 0xC0, 0xA0]
    );

    // text stays verbatim
    let pn_bytes = obj.element(Tag(0x0010, 0x0010)).unwrap().raw_data().unwrap();
    assert_eq!(pn_bytes, b"Doe^John");
}

#[test]
fn conversion_back_and_forth_is_lossless() {
    let mut obj = sample_object();
    let original = obj.clone();
    obj.set_transfer_syntax(entries::EXPLICIT_VR_BIG_ENDIAN).unwrap();
    obj.set_transfer_syntax(entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
    assert_eq!(obj, original);
}

#[test]
fn implicit_vr_round_trip_preserves_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("implicit.dcm");

    let mut obj =
        DataObject::new_empty_with_transfer_syntax(entries::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
    obj.add(InMemElement::new(
        Tag(0x0072, 0x0026),
        VR::AT,
        Tag(0x0028, 0x2110),
    ));
    obj.add(InMemElement::new(Tag(0x0010, 0x0010), VR::PN, "Doe^John"));
    obj.write_to_file(&path).unwrap();

    // without a dictionary the elements come back as UN,
    // but their bytes are intact
    let reread = DataObject::open_file(&path).unwrap();
    assert_eq!(reread.transfer_syntax().uid(), "1.2.840.10008.1.2");
    assert_eq!(
        reread.element(Tag(0x0072, 0x0026)).unwrap().raw_data().unwrap(),
        &[0x28, 0x00, 0x10, 0x21]
    );
    assert_eq!(
        reread.element(Tag(0x0010, 0x0010)).unwrap().raw_data().unwrap(),
        b"Doe^John"
    );
}

#[test]
fn meta_table_follows_the_transfer_syntax() {
    let mut obj = sample_object();
    obj.set_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(obj.transfer_syntax().uid())
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .build()
            .unwrap(),
    );
    obj.set_transfer_syntax(entries::EXPLICIT_VR_BIG_ENDIAN).unwrap();
    assert_eq!(obj.meta().unwrap().transfer_syntax(), "1.2.840.10008.1.2.2");
}

#[test]
fn tag_text_addressing() {
    let obj = sample_object();
    assert!(obj.exists_at("0072,0026").unwrap());
    assert_eq!(
        obj.value_at("0072,0026").unwrap().unwrap().tags().unwrap()[0],
        Tag(0x0028, 0x2110)
    );
    // case-insensitive
    assert!(obj.exists_at("0040,0260").unwrap());
    assert!(obj.element_at("10b0,c0a0").unwrap().is_none());
    // malformed text is an error, not an absence
    assert!(obj.exists_at("72,26").is_err());
    assert!(obj.exists_at("(0072,0026)").is_err());
}

#[test]
fn tag_text_case_does_not_create_duplicates() {
    let mut obj = sample_object();
    let before = obj.dataset().len();
    let tag: Tag = "0072,0026".parse().unwrap();
    obj.add(InMemElement::new(tag, VR::AT, Tag(0x10B0, 0xC0A0)));
    assert_eq!(obj.dataset().len(), before);
    assert_eq!(
        obj.value(Tag(0x0072, 0x0026)).unwrap().tag(),
        Ok(Tag(0x10B0, 0xC0A0))
    );
}
