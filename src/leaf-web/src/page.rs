/// The single page served at `/`. Results are written with `textContent`
/// only, never as markup.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Plant Disease Detection</title>
<style>
  body {
    margin: 0;
    font-family: system-ui, sans-serif;
    background-color: #f3f7f1;
    background-image: url(/background);
    background-size: cover;
    background-position: center;
    background-repeat: no-repeat;
    background-attachment: fixed;
  }
  main {
    max-width: 720px;
    margin: 0 auto;
    padding: 2rem 1.5rem 4rem;
    background: rgba(255, 255, 255, 0.88);
    min-height: 100vh;
    box-sizing: border-box;
  }
  h1 { margin-top: 0; }
  figure { margin: 1.5rem 0; }
  figure img { width: 100%; border-radius: 6px; }
  figcaption { text-align: center; color: #555; font-size: 0.9rem; }
  .block { padding: 0.9rem 1rem; border-radius: 6px; margin: 0.75rem 0; }
  .success { background: #dff3e3; color: #0f5323; }
  .info { background: #e1edf9; color: #0b3b66; }
  .error { background: #fbe3e1; color: #7a1912; }
  .hidden { display: none; }
</style>
</head>
<body>
<main>
  <h1>&#x1F331; Plant Disease Detection</h1>
  <p>Upload a plant leaf image to identify the disease and get details about it.</p>

  <label for="upload">Choose a leaf image...</label>
  <input id="upload" type="file" accept=".jpg,.jpeg,.png,image/jpeg,image/png">

  <figure id="preview" class="hidden">
    <img id="preview-img" alt="Uploaded Image">
    <figcaption>Uploaded Image</figcaption>
  </figure>

  <div id="spinner" class="block info hidden">Analyzing the image...</div>
  <div id="disease" class="block success hidden"></div>
  <div id="description" class="block info hidden"></div>
  <div id="failure" class="block error hidden"></div>
</main>
<script>
  const allowed = ["jpg", "jpeg", "png"];
  const $ = (id) => document.getElementById(id);

  function show(id, text) {
    const el = $(id);
    if (text !== undefined) el.textContent = text;
    el.classList.remove("hidden");
  }

  function hide(...ids) {
    ids.forEach((id) => $(id).classList.add("hidden"));
  }

  $("upload").addEventListener("change", async (event) => {
    const file = event.target.files[0];
    hide("disease", "description", "failure", "spinner", "preview");
    if (!file) return;

    const ext = file.name.split(".").pop().toLowerCase();
    if (!allowed.includes(ext)) {
      show("failure", "Unsupported file type, expected one of: jpg, jpeg, png");
      return;
    }

    const img = $("preview-img");
    if (img.src) URL.revokeObjectURL(img.src);
    img.src = URL.createObjectURL(file);
    show("preview");
    show("spinner");

    try {
      const resp = await fetch("/predict?filename=" + encodeURIComponent(file.name), {
        method: "POST",
        body: file,
      });
      const body = await resp.json();
      hide("spinner");
      if (!resp.ok) {
        show("failure", body.error || ("Request failed with status " + resp.status));
        return;
      }
      show("disease", "Predicted Disease: " + body.label);
      show("description", "Description: " + body.description);
    } catch (err) {
      hide("spinner");
      show("failure", "Request failed: " + err);
    }
  });
</script>
</body>
</html>
"#;
